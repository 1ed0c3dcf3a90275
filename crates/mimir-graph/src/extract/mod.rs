//! Multi-phase edge extraction over the chunk stream.
//!
//! Four sequential phases, each a parallel fan-out over chunks on a
//! bounded worker pool. Workers emit into a shared lock-free queue that is
//! drained only at the phase barrier:
//!
//! 1. code → code (`Calls`, `References`, `Inherits`, `Implements`)
//! 2. xml → code (`XmlBindsClass`, `XmlUsesComp`)
//! 3. xml → xml (`XmlInherits`, `XmlReferences`), emitted then filtered
//! 4. the `CodeUsedByDef` transpose of every phase-2 edge

pub mod code;
pub mod fields;
pub mod symbols;
pub mod xml;

use crossbeam::queue::SegQueue;
use mimir_core::{ChunkRecord, IndexConfig, MimirError};
use rayon::prelude::*;
use tree_sitter::Parser;

use crate::edge::Edge;
use code::{extract_code_edges, ResolutionCache};
use fields::discover_linkable_fields;
use symbols::CompilationIndex;
use xml::{extract_class_bindings, extract_def_references, ClassBinding, KnownDefs};

/// A C# parser with the grammar loaded.
///
/// # Errors
///
/// Returns [`MimirError::Parse`] when the bundled grammar is incompatible
/// with the linked tree-sitter runtime.
pub fn csharp_parser() -> Result<Parser, MimirError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_c_sharp::LANGUAGE.into())
        .map_err(|e| MimirError::Parse(format!("failed to load C# grammar: {e}")))?;
    Ok(parser)
}

/// Run all four extraction phases and return the combined edge multiset.
///
/// Chunks that fail to parse are logged and skipped; they never fail the
/// build.
///
/// # Errors
///
/// Returns [`MimirError::Parse`] if the C# grammar cannot be loaded and
/// [`MimirError::Config`] if the worker pool cannot be created.
///
/// # Examples
///
/// ```
/// use mimir_core::IndexConfig;
/// use mimir_graph::extract::extract_edges;
///
/// let edges = extract_edges(&[], &IndexConfig::default()).unwrap();
/// assert!(edges.is_empty());
/// ```
pub fn extract_edges(
    chunks: &[ChunkRecord],
    config: &IndexConfig,
) -> Result<Vec<Edge>, MimirError> {
    // Fail fast if the grammar cannot load at all; workers assume it does.
    drop(csharp_parser()?);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.parallelism)
        .build()
        .map_err(|e| MimirError::Config(format!("failed to build worker pool: {e}")))?;

    let index = CompilationIndex::build(chunks);
    let linkable_fields = discover_linkable_fields(&index, config);

    let code_chunks: Vec<&ChunkRecord> = chunks.iter().filter(|c| !c.is_xml()).collect();
    let xml_chunks: Vec<&ChunkRecord> = chunks.iter().filter(|c| c.is_xml()).collect();

    let sink: SegQueue<Edge> = SegQueue::new();

    // Phase 1: code → code
    pool.install(|| {
        code_chunks.par_iter().for_each_init(
            || {
                let parser = csharp_parser().unwrap_or_else(|_| Parser::new());
                (parser, ResolutionCache::new())
            },
            |(parser, cache), chunk| {
                for edge in extract_code_edges(chunk, parser, cache, &index, config.resolution) {
                    sink.push(edge);
                }
            },
        );
    });
    let phase1 = drain(&sink);
    tracing::info!(edges = phase1.len(), "phase 1 (code→code) complete");

    // Phase 2: xml → code
    let binding = ClassBinding {
        linkable_fields: &linkable_fields,
        namespace_rules: &config.namespace_rules,
        default_namespace: &config.default_namespace,
    };
    pool.install(|| {
        xml_chunks.par_iter().for_each(|chunk| {
            for edge in extract_class_bindings(chunk, &binding) {
                sink.push(edge);
            }
        });
    });
    let phase2 = drain(&sink);
    tracing::info!(edges = phase2.len(), "phase 2 (xml→code) complete");

    // Phase 3: xml → xml, emitted then filtered against the known Def set
    pool.install(|| {
        xml_chunks.par_iter().for_each(|chunk| {
            for edge in extract_def_references(chunk) {
                sink.push(edge);
            }
        });
    });
    let known = KnownDefs::from_chunks(chunks);
    let raw_phase3 = drain(&sink);
    let raw_count = raw_phase3.len();
    let phase3 = known.retain_known(raw_phase3);
    tracing::info!(
        edges = phase3.len(),
        dropped = raw_count - phase3.len(),
        "phase 3 (xml→xml) complete"
    );

    // Phase 4: reverse edges for every phase-2 binding
    let phase4: Vec<Edge> = phase2.iter().map(Edge::transposed).collect();
    tracing::info!(edges = phase4.len(), "phase 4 (reverse) complete");

    let mut edges = phase1;
    edges.extend(phase2);
    edges.extend(phase3);
    edges.extend(phase4);
    Ok(edges)
}

fn drain(sink: &SegQueue<Edge>) -> Vec<Edge> {
    std::iter::from_fn(|| sink.pop()).collect()
}
