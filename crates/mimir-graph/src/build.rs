//! The end-to-end graph build: extract, assemble, persist, rank.

use std::path::Path;

use mimir_core::{ChunkRecord, IndexConfig, MimirError};

use crate::extract::extract_edges;
use crate::pagerank::{compute_pagerank, write_pagerank};
use crate::sparse::{assemble_graph, write_graph, ArtifactPaths};

/// Counts reported after a successful build.
///
/// # Examples
///
/// ```
/// use mimir_graph::build::BuildSummary;
///
/// let summary = BuildSummary { chunks: 10, nodes: 12, edges: 30 };
/// assert_eq!(summary.nodes, 12);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct BuildSummary {
    /// Chunks consumed.
    pub chunks: usize,
    /// Distinct nodes interned.
    pub nodes: usize,
    /// Edges emitted (duplicates included).
    pub edges: usize,
}

/// Build the whole on-disk graph under `base`: run the extraction phases,
/// intern and persist the sparse views, then compute and persist PageRank.
///
/// The progression is strictly linear; a failure in any step aborts the
/// build, and because every writer stages through a temp sibling, no final
/// artefact path is ever left truncated.
///
/// # Errors
///
/// Returns [`MimirError::Parse`] when the grammar cannot load,
/// [`MimirError::Config`] for an unusable worker pool, and
/// [`MimirError::Io`] on write failure.
///
/// # Examples
///
/// ```
/// use mimir_core::IndexConfig;
/// use mimir_graph::build::build_artifacts;
///
/// let dir = tempfile::tempdir().unwrap();
/// let base = dir.path().join("graph");
/// let summary = build_artifacts(&[], &IndexConfig::default(), &base).unwrap();
/// assert_eq!(summary.nodes, 0);
/// ```
pub fn build_artifacts(
    chunks: &[ChunkRecord],
    config: &IndexConfig,
    base: &Path,
) -> Result<BuildSummary, MimirError> {
    let edges = extract_edges(chunks, config)?;
    let graph = assemble_graph(chunks, &edges);
    write_graph(base, &graph)?;

    let scores = compute_pagerank(&graph.csr, &graph.csc);
    write_pagerank(&ArtifactPaths::new(base).pagerank, &graph.nodes, &scores)?;

    let summary = BuildSummary {
        chunks: chunks.len(),
        nodes: graph.nodes.len(),
        edges: edges.len(),
    };
    tracing::info!(
        chunks = summary.chunks,
        nodes = summary.nodes,
        edges = summary.edges,
        base = %base.display(),
        "graph build complete"
    );
    Ok(summary)
}
