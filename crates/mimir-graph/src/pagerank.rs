//! PageRank over the CSR/CSC views.
//!
//! Classic power method: incoming mass is enumerated via CSC, out-degrees
//! come from CSR row pointers, dangling mass is redistributed uniformly,
//! and edge kinds are ignored. Converges on an L1 delta below `1e-6` or
//! stops after 100 iterations.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use mimir_core::MimirError;

use crate::sparse::{write_atomic, NodeTable, SparseMatrix};

const DAMPING: f64 = 0.85;
const MAX_ITERATIONS: usize = 100;
const CONVERGENCE_EPSILON: f64 = 1e-6;

/// Compute PageRank scores for every node.
///
/// Returns one score per node index; scores sum to 1 within floating-point
/// slack. An empty graph yields an empty vector.
///
/// # Examples
///
/// ```
/// use mimir_graph::edge::{Edge, EdgeKind};
/// use mimir_graph::pagerank::compute_pagerank;
/// use mimir_graph::sparse::assemble_graph;
///
/// let graph = assemble_graph(&[], &[Edge::new("X", "Y", EdgeKind::Calls)]);
/// let scores = compute_pagerank(&graph.csr, &graph.csc);
/// assert_eq!(scores.len(), 2);
/// let total: f64 = scores.iter().sum();
/// assert!((total - 1.0).abs() < 1e-6);
/// // Y receives X's vote and ranks higher
/// assert!(scores[1] > scores[0]);
/// ```
pub fn compute_pagerank(csr: &SparseMatrix, csc: &SparseMatrix) -> Vec<f64> {
    let n = csr.node_count;
    if n == 0 {
        return Vec::new();
    }

    let n_f64 = n as f64;
    let base = (1.0 - DAMPING) / n_f64;

    let out_degrees: Vec<usize> = (0..n as u32).map(|i| csr.degree(i)).collect();
    let mut scores = vec![1.0 / n_f64; n];

    for _ in 0..MAX_ITERATIONS {
        let dangling_mass: f64 = out_degrees
            .iter()
            .zip(&scores)
            .filter(|(deg, _)| **deg == 0)
            .map(|(_, score)| *score)
            .sum();

        let mut next = vec![0.0f64; n];
        for (i, slot) in next.iter_mut().enumerate() {
            let incoming: f64 = csc
                .neighbors(i as u32)
                .map(|(j, _kind)| scores[j as usize] / out_degrees[j as usize] as f64)
                .sum();
            *slot = base + DAMPING * incoming + DAMPING * dangling_mass / n_f64;
        }

        let delta: f64 = next
            .iter()
            .zip(&scores)
            .map(|(a, b)| (a - b).abs())
            .sum();
        scores = next;
        if delta < CONVERGENCE_EPSILON {
            break;
        }
    }

    scores
}

/// Persist scores as `<base>.pagerank.tsv`: `symbol<TAB>score` with six
/// fractional digits, sorted by score descending.
///
/// # Errors
///
/// Returns [`MimirError::Io`] on write failure.
pub fn write_pagerank(path: &Path, nodes: &NodeTable, scores: &[f64]) -> Result<(), MimirError> {
    let mut rows: Vec<(&str, f64)> = nodes
        .ids()
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), scores.get(i).copied().unwrap_or(0.0)))
        .collect();
    rows.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });

    let mut out = String::new();
    for (id, score) in rows {
        out.push_str(&format!("{id}\t{score:.6}\n"));
    }
    write_atomic(path, out.as_bytes())
}

/// Load a PageRank TSV into a symbol → score map.
///
/// # Errors
///
/// Returns [`MimirError::Io`] when the file cannot be read and
/// [`MimirError::Artifact`] on malformed lines.
pub fn read_pagerank(path: &Path) -> Result<HashMap<String, f64>, MimirError> {
    let content = fs::read_to_string(path)?;
    let mut scores = HashMap::new();
    for (lineno, line) in content.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let Some((symbol, score)) = line.split_once('\t') else {
            return Err(MimirError::Artifact(format!(
                "{}: line {} has no tab separator",
                path.display(),
                lineno + 1
            )));
        };
        let score: f64 = score.parse().map_err(|_| {
            MimirError::Artifact(format!(
                "{}: line {} has a non-numeric score: {score:?}",
                path.display(),
                lineno + 1
            ))
        })?;
        scores.insert(symbol.to_string(), score);
    }
    Ok(scores)
}
