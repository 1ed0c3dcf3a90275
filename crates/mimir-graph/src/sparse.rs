//! Compressed-sparse persistence of the knowledge graph.
//!
//! The graph is stored as four sibling artefacts sharing a base path:
//! a node table (`.nodes.tsv`), a CSR view keyed by source (`.csr.bin`),
//! a CSC view keyed by target (`.csc.bin`), and PageRank scores
//! (`.pagerank.tsv`). The binary layout is little-endian: a 4-byte ASCII
//! magic, `i32` version, `i32` node count, `i32` edge count, the pointer
//! array (`node_count + 1` entries), the index array, an `i32` kinds
//! length, and one kind byte per edge.
//!
//! Writers stage to a sibling `.tmp` path and rename so a failed build
//! never leaves a truncated artefact under its final name.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use mimir_core::{ChunkRecord, MimirError};

use crate::edge::Edge;

const CSR_MAGIC: &[u8; 4] = b"CSR1";
const CSC_MAGIC: &[u8; 4] = b"CSC1";
const FORMAT_VERSION: i32 = 1;

/// Paths of the four on-disk artefacts derived from a base path.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use mimir_graph::sparse::ArtifactPaths;
///
/// let paths = ArtifactPaths::new(Path::new("/tmp/index/graph"));
/// assert!(paths.csr.ends_with("graph.csr.bin"));
/// assert!(paths.pagerank.ends_with("graph.pagerank.tsv"));
/// ```
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    /// `<base>.nodes.tsv`
    pub nodes: PathBuf,
    /// `<base>.csr.bin`
    pub csr: PathBuf,
    /// `<base>.csc.bin`
    pub csc: PathBuf,
    /// `<base>.pagerank.tsv`
    pub pagerank: PathBuf,
}

impl ArtifactPaths {
    /// Derive artefact paths from a base path (no extension).
    pub fn new(base: &Path) -> Self {
        let with = |suffix: &str| {
            let mut s = base.as_os_str().to_os_string();
            s.push(suffix);
            PathBuf::from(s)
        };
        Self {
            nodes: with(".nodes.tsv"),
            csr: with(".csr.bin"),
            csc: with(".csc.bin"),
            pagerank: with(".pagerank.tsv"),
        }
    }
}

/// The node table: symbol IDs numbered by first insertion.
///
/// # Examples
///
/// ```
/// use mimir_graph::sparse::NodeTable;
///
/// let mut table = NodeTable::new();
/// let a = table.intern("Verse.Pawn");
/// let b = table.intern("xml:ThingDef:Steel");
/// assert_eq!(table.intern("Verse.Pawn"), a);
/// assert_eq!(table.id_of(b), Some("xml:ThingDef:Steel"));
/// assert_eq!(table.len(), 2);
/// ```
#[derive(Debug, Default, Clone)]
pub struct NodeTable {
    ids: Vec<String>,
    index: HashMap<String, u32>,
}

impl NodeTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a symbol ID, returning its stable index.
    pub fn intern(&mut self, id: &str) -> u32 {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let idx = self.ids.len() as u32;
        self.ids.push(id.to_string());
        self.index.insert(id.to_string(), idx);
        idx
    }

    /// Look up the index of a known symbol ID.
    pub fn index_of(&self, id: &str) -> Option<u32> {
        self.index.get(id).copied()
    }

    /// Look up the symbol ID at an index.
    pub fn id_of(&self, idx: u32) -> Option<&str> {
        self.ids.get(idx as usize).map(String::as_str)
    }

    /// Number of interned nodes.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True when no node has been interned.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// All symbol IDs in index order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}

/// One compressed-sparse view of the edge set.
///
/// For CSR the pointers are keyed by source and `indices` hold targets;
/// for CSC the roles are transposed. `kinds[k]` is the edge-kind byte of
/// the edge at position `k` of `indices`.
///
/// # Examples
///
/// ```
/// use mimir_graph::sparse::SparseMatrix;
///
/// // Two nodes, one edge 0 → 1 of kind 1 (Calls)
/// let m = SparseMatrix {
///     node_count: 2,
///     pointers: vec![0, 1, 1],
///     indices: vec![1],
///     kinds: vec![1],
/// };
/// let row: Vec<(u32, u8)> = m.neighbors(0).collect();
/// assert_eq!(row, vec![(1, 1)]);
/// assert_eq!(m.degree(1), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseMatrix {
    /// Number of nodes (rows).
    pub node_count: usize,
    /// Row/column pointer array, `node_count + 1` entries, monotonic.
    pub pointers: Vec<u32>,
    /// Counterpart node index per edge.
    pub indices: Vec<u32>,
    /// Edge-kind byte per edge.
    pub kinds: Vec<u8>,
}

impl SparseMatrix {
    /// Number of edges in this view.
    pub fn edge_count(&self) -> usize {
        self.indices.len()
    }

    /// Degree of a node in this view (out-degree for CSR, in-degree for CSC).
    pub fn degree(&self, node: u32) -> usize {
        let i = node as usize;
        if i + 1 >= self.pointers.len() {
            return 0;
        }
        (self.pointers[i + 1] - self.pointers[i]) as usize
    }

    /// Iterate the `(counterpart_index, kind_byte)` pairs of a node's row.
    pub fn neighbors(&self, node: u32) -> impl Iterator<Item = (u32, u8)> + '_ {
        let i = node as usize;
        let (start, end) = if i + 1 < self.pointers.len() {
            (self.pointers[i] as usize, self.pointers[i + 1] as usize)
        } else {
            (0, 0)
        };
        (start..end).map(move |k| (self.indices[k], self.kinds[k]))
    }
}

/// Build the CSR view from `(src, dst, kind)` triples.
///
/// Rows are grouped by source; within a row, edges are ordered by target
/// index then kind byte.
pub fn build_csr(triples: &[(u32, u32, u8)], node_count: usize) -> SparseMatrix {
    build_view(triples, node_count, |&(src, dst, kind)| (src, dst, kind))
}

/// Build the CSC view from the same triples by symmetric grouping on target.
pub fn build_csc(triples: &[(u32, u32, u8)], node_count: usize) -> SparseMatrix {
    build_view(triples, node_count, |&(src, dst, kind)| (dst, src, kind))
}

fn build_view(
    triples: &[(u32, u32, u8)],
    node_count: usize,
    project: impl Fn(&(u32, u32, u8)) -> (u32, u32, u8),
) -> SparseMatrix {
    let mut projected: Vec<(u32, u32, u8)> = triples.iter().map(project).collect();
    projected.sort_unstable();

    let mut pointers = Vec::with_capacity(node_count + 1);
    let mut indices = Vec::with_capacity(projected.len());
    let mut kinds = Vec::with_capacity(projected.len());

    pointers.push(0u32);
    let mut cursor = 0usize;
    for row in 0..node_count as u32 {
        while cursor < projected.len() && projected[cursor].0 == row {
            indices.push(projected[cursor].1);
            kinds.push(projected[cursor].2);
            cursor += 1;
        }
        pointers.push(indices.len() as u32);
    }

    SparseMatrix {
        node_count,
        pointers,
        indices,
        kinds,
    }
}

/// The fully built graph, ready to persist or rank.
#[derive(Debug)]
pub struct BuiltGraph {
    /// Symbol IDs in index order.
    pub nodes: NodeTable,
    /// Source-keyed view.
    pub csr: SparseMatrix,
    /// Target-keyed view.
    pub csc: SparseMatrix,
}

/// Intern nodes and build both sparse views from the extracted edge
/// multiset plus the chunk list.
///
/// Node indices are assigned in chunk iteration order first, then in
/// endpoint order of the edge multiset sorted by `(source, target, kind)`;
/// given the same input the artefact is byte-identical. Duplicate edges
/// are kept (the query engine collapses them with a multiplicity).
///
/// # Examples
///
/// ```
/// use mimir_graph::edge::{Edge, EdgeKind};
/// use mimir_graph::sparse::assemble_graph;
///
/// let edges = vec![Edge::new("A", "B", EdgeKind::Calls)];
/// let graph = assemble_graph(&[], &edges);
/// assert_eq!(graph.nodes.len(), 2);
/// assert_eq!(graph.csr.edge_count(), 1);
/// assert_eq!(graph.csc.edge_count(), 1);
/// ```
pub fn assemble_graph(chunks: &[ChunkRecord], edges: &[Edge]) -> BuiltGraph {
    let mut nodes = NodeTable::new();
    for chunk in chunks {
        nodes.intern(&chunk.id);
    }

    let mut ordered: Vec<&Edge> = edges.iter().collect();
    ordered.sort_unstable_by(|a, b| {
        (&a.source, &a.target, a.kind.byte()).cmp(&(&b.source, &b.target, b.kind.byte()))
    });

    let mut triples = Vec::with_capacity(ordered.len());
    for edge in ordered {
        let src = nodes.intern(&edge.source);
        let dst = nodes.intern(&edge.target);
        triples.push((src, dst, edge.kind.byte()));
    }

    let node_count = nodes.len();
    BuiltGraph {
        nodes,
        csr: build_csr(&triples, node_count),
        csc: build_csc(&triples, node_count),
    }
}

/// Persist the node table and both binary views under `base`.
///
/// # Errors
///
/// Returns [`MimirError::Io`] on write failure; the final paths are never
/// left holding a partial file.
pub fn write_graph(base: &Path, graph: &BuiltGraph) -> Result<(), MimirError> {
    let paths = ArtifactPaths::new(base);
    if let Some(parent) = paths.nodes.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut nodes_out = String::new();
    for (idx, id) in graph.nodes.ids().iter().enumerate() {
        nodes_out.push_str(&format!("{idx}\t{id}\n"));
    }
    write_atomic(&paths.nodes, nodes_out.as_bytes())?;

    write_atomic(&paths.csr, &encode_matrix(CSR_MAGIC, &graph.csr))?;
    write_atomic(&paths.csc, &encode_matrix(CSC_MAGIC, &graph.csc))?;
    Ok(())
}

/// Write `bytes` to a sibling temp path, then rename over the final path.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), MimirError> {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = fs::File::create(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp, path)?;
    Ok(())
}

fn encode_matrix(magic: &[u8; 4], matrix: &SparseMatrix) -> Vec<u8> {
    let edge_count = matrix.edge_count();
    let mut out = Vec::with_capacity(16 + 4 * (matrix.pointers.len() + matrix.indices.len() + 1) + edge_count);

    out.extend_from_slice(magic);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&(matrix.node_count as i32).to_le_bytes());
    out.extend_from_slice(&(edge_count as i32).to_le_bytes());
    for p in &matrix.pointers {
        out.extend_from_slice(&(*p as i32).to_le_bytes());
    }
    for i in &matrix.indices {
        out.extend_from_slice(&(*i as i32).to_le_bytes());
    }
    out.extend_from_slice(&(edge_count as i32).to_le_bytes());
    out.extend_from_slice(&matrix.kinds);
    out
}

/// Decode one binary view, verifying magic, version, and framing.
///
/// # Errors
///
/// Returns [`MimirError::Artifact`] on a bad magic, unsupported version,
/// truncation, or a kinds length that disagrees with the edge count.
pub fn decode_matrix(magic: &[u8; 4], bytes: &[u8]) -> Result<SparseMatrix, MimirError> {
    let mut reader = ByteReader::new(bytes);

    let found = reader.take(4)?;
    if found != magic {
        return Err(MimirError::Artifact(format!(
            "bad magic: expected {:?}, found {:?}",
            String::from_utf8_lossy(magic),
            String::from_utf8_lossy(found),
        )));
    }

    let version = reader.read_i32()?;
    if version != FORMAT_VERSION {
        return Err(MimirError::Artifact(format!(
            "unsupported version {version}, expected {FORMAT_VERSION}"
        )));
    }

    let node_count = reader.read_len("node count")?;
    let edge_count = reader.read_len("edge count")?;

    let mut pointers = Vec::with_capacity(node_count + 1);
    for _ in 0..=node_count {
        pointers.push(reader.read_i32()? as u32);
    }
    if pointers.last().copied() != Some(edge_count as u32) {
        return Err(MimirError::Artifact(format!(
            "pointer array ends at {:?}, expected edge count {edge_count}",
            pointers.last()
        )));
    }

    let mut indices = Vec::with_capacity(edge_count);
    for _ in 0..edge_count {
        indices.push(reader.read_i32()? as u32);
    }

    let kinds_length = reader.read_len("kinds length")?;
    if kinds_length != edge_count {
        return Err(MimirError::Artifact(format!(
            "kinds length {kinds_length} does not match edge count {edge_count}"
        )));
    }
    let kinds = reader.take(edge_count)?.to_vec();

    if !reader.is_empty() {
        return Err(MimirError::Artifact(format!(
            "{} trailing bytes after kind array",
            reader.remaining()
        )));
    }

    Ok(SparseMatrix {
        node_count,
        pointers,
        indices,
        kinds,
    })
}

/// Read and decode a binary view from disk.
///
/// # Errors
///
/// Returns [`MimirError::Io`] when the file cannot be read and
/// [`MimirError::Artifact`] when the content fails validation.
pub fn read_matrix(path: &Path, magic: &[u8; 4]) -> Result<SparseMatrix, MimirError> {
    let bytes = fs::read(path)?;
    decode_matrix(magic, &bytes).map_err(|e| match e {
        MimirError::Artifact(msg) => MimirError::Artifact(format!("{}: {msg}", path.display())),
        other => other,
    })
}

/// Magic for the CSR artefact.
pub fn csr_magic() -> &'static [u8; 4] {
    CSR_MAGIC
}

/// Magic for the CSC artefact.
pub fn csc_magic() -> &'static [u8; 4] {
    CSC_MAGIC
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], MimirError> {
        if self.pos + n > self.bytes.len() {
            return Err(MimirError::Artifact(format!(
                "truncated: wanted {n} bytes at offset {}, file has {}",
                self.pos,
                self.bytes.len()
            )));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_i32(&mut self) -> Result<i32, MimirError> {
        let slice = self.take(4)?;
        Ok(i32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
    }

    fn read_len(&mut self, what: &str) -> Result<usize, MimirError> {
        let value = self.read_i32()?;
        usize::try_from(value)
            .map_err(|_| MimirError::Artifact(format!("negative {what}: {value}")))
    }

    fn is_empty(&self) -> bool {
        self.pos == self.bytes.len()
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }
}
