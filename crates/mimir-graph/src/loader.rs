//! One-time loading of the persisted graph artefacts.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use mimir_core::MimirError;

use crate::pagerank::read_pagerank;
use crate::sparse::{csc_magic, csr_magic, read_matrix, ArtifactPaths, SparseMatrix};

/// The loaded, read-only knowledge graph.
///
/// Holds the node table, both sparse views, and the PageRank map. All
/// artefacts are validated at load time; queries may assume a consistent
/// snapshot and share the store freely across threads.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use mimir_graph::loader::GraphStore;
///
/// let store = GraphStore::load(Path::new(".mimir/graph")).unwrap();
/// println!("{} nodes, {} edges", store.node_count(), store.edge_count());
/// ```
#[derive(Debug)]
pub struct GraphStore {
    nodes: Vec<String>,
    index: HashMap<String, u32>,
    csr: SparseMatrix,
    csc: SparseMatrix,
    pagerank: HashMap<String, f64>,
}

impl GraphStore {
    /// Read all four artefacts under `base`.
    ///
    /// # Errors
    ///
    /// Returns [`MimirError::Io`] when a file is missing and
    /// [`MimirError::Artifact`] on magic/version mismatch, truncation, a
    /// kinds length disagreeing with the edge count, or a node index that
    /// is out of table range.
    pub fn load(base: &Path) -> Result<Self, MimirError> {
        let paths = ArtifactPaths::new(base);

        let nodes = read_node_table(&paths.nodes)?;
        let csr = read_matrix(&paths.csr, csr_magic())?;
        let csc = read_matrix(&paths.csc, csc_magic())?;
        let pagerank = read_pagerank(&paths.pagerank)?;

        if csr.node_count != nodes.len() || csc.node_count != nodes.len() {
            return Err(MimirError::Artifact(format!(
                "node table has {} entries but CSR/CSC claim {}/{}",
                nodes.len(),
                csr.node_count,
                csc.node_count
            )));
        }
        if csr.edge_count() != csc.edge_count() {
            return Err(MimirError::Artifact(format!(
                "CSR has {} edges but CSC has {}",
                csr.edge_count(),
                csc.edge_count()
            )));
        }
        for view in [&csr, &csc] {
            if let Some(&bad) = view.indices.iter().find(|&&i| i as usize >= nodes.len()) {
                return Err(MimirError::Artifact(format!(
                    "edge references node {bad} outside the {}-entry node table",
                    nodes.len()
                )));
            }
        }

        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i as u32))
            .collect();

        Ok(Self {
            nodes,
            index,
            csr,
            csc,
            pagerank,
        })
    }

    /// Number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.csr.edge_count()
    }

    /// Symbol ID at a node index.
    pub fn symbol_id(&self, idx: u32) -> Option<&str> {
        self.nodes.get(idx as usize).map(String::as_str)
    }

    /// Node index of an exact symbol ID.
    pub fn node_index(&self, symbol_id: &str) -> Option<u32> {
        self.index.get(symbol_id).copied()
    }

    /// All symbol IDs in node-index order.
    pub fn symbol_ids(&self) -> &[String] {
        &self.nodes
    }

    /// Outgoing `(target_index, kind_byte)` pairs of a node.
    pub fn out_neighbors(&self, idx: u32) -> impl Iterator<Item = (u32, u8)> + '_ {
        self.csr.neighbors(idx)
    }

    /// Incoming `(source_index, kind_byte)` pairs of a node.
    pub fn in_neighbors(&self, idx: u32) -> impl Iterator<Item = (u32, u8)> + '_ {
        self.csc.neighbors(idx)
    }

    /// PageRank score of a symbol, if it was ranked.
    pub fn pagerank_of(&self, symbol_id: &str) -> Option<f64> {
        self.pagerank.get(symbol_id).copied()
    }
}

fn read_node_table(path: &Path) -> Result<Vec<String>, MimirError> {
    let content = fs::read_to_string(path)?;
    let mut nodes = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let Some((idx, id)) = line.split_once('\t') else {
            return Err(MimirError::Artifact(format!(
                "{}: line {} has no tab separator",
                path.display(),
                lineno + 1
            )));
        };
        let idx: usize = idx.parse().map_err(|_| {
            MimirError::Artifact(format!(
                "{}: line {} has a non-numeric index: {idx:?}",
                path.display(),
                lineno + 1
            ))
        })?;
        if idx != nodes.len() {
            return Err(MimirError::Artifact(format!(
                "{}: line {} is index {idx}, expected {}",
                path.display(),
                lineno + 1,
                nodes.len()
            )));
        }
        nodes.push(id.to_string());
    }
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::{Edge, EdgeKind};
    use crate::pagerank::{compute_pagerank, write_pagerank};
    use crate::sparse::{assemble_graph, write_graph};

    fn write_sample(base: &Path) {
        let edges = vec![
            Edge::new("A", "B", EdgeKind::Inherits),
            Edge::new("xml:D", "A", EdgeKind::XmlBindsClass),
            Edge::new("A", "xml:D", EdgeKind::CodeUsedByDef),
        ];
        let graph = assemble_graph(&[], &edges);
        let scores = compute_pagerank(&graph.csr, &graph.csc);
        write_graph(base, &graph).unwrap();
        write_pagerank(&ArtifactPaths::new(base).pagerank, &graph.nodes, &scores).unwrap();
    }

    #[test]
    fn load_exposes_neighbors_in_both_directions() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("graph");
        write_sample(&base);

        let store = GraphStore::load(&base).unwrap();
        assert_eq!(store.node_count(), 3);
        assert_eq!(store.edge_count(), 3);

        let a = store.node_index("A").unwrap();
        let out: Vec<(u32, u8)> = store.out_neighbors(a).collect();
        let in_: Vec<(u32, u8)> = store.in_neighbors(a).collect();
        assert_eq!(out.len(), 2); // Inherits B, CodeUsedByDef xml:D
        assert_eq!(in_.len(), 1); // XmlBindsClass from xml:D

        assert!(store.pagerank_of("A").is_some());
        assert_eq!(store.pagerank_of("unknown"), None);
    }

    #[test]
    fn missing_artifact_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("graph");
        let result = GraphStore::load(&base);
        assert!(result.is_err());
    }

    #[test]
    fn corrupt_node_table_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("graph");
        write_sample(&base);

        let paths = ArtifactPaths::new(&base);
        std::fs::write(&paths.nodes, "0\tA\n5\tB\n").unwrap();
        let err = GraphStore::load(&base).unwrap_err();
        assert!(matches!(err, MimirError::Artifact(_)), "{err}");
    }

    #[test]
    fn node_count_mismatch_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("graph");
        write_sample(&base);

        let paths = ArtifactPaths::new(&base);
        std::fs::write(&paths.nodes, "0\tA\n").unwrap();
        let err = GraphStore::load(&base).unwrap_err();
        assert!(err.to_string().contains("node table"), "{err}");
    }
}
