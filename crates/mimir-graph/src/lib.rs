//! Knowledge-graph subsystem for the Mimir indexer.
//!
//! Turns the chunk stream into a typed directed graph spanning two symbol
//! universes (C# code and XML Defs), persists it as CSR/CSC binaries plus
//! a node table, ranks nodes with PageRank, and serves ranked single-hop
//! queries that fuse graph topology with string similarity.
//!
//! Build side: [`build::build_artifacts`] runs the four extraction phases
//! ([`extract`]), interns nodes and writes the artefacts ([`sparse`]), and
//! ranks them ([`pagerank`]). Query side: [`loader::GraphStore`] loads the
//! artefacts once, [`query::query`] resolves a reference ([`resolve`],
//! [`fuzzy`]) and walks one hop in either direction.

pub mod build;
pub mod edge;
pub mod extract;
pub mod fuzzy;
pub mod loader;
pub mod pagerank;
pub mod query;
pub mod resolve;
pub mod sparse;

pub use build::{build_artifacts, BuildSummary};
pub use edge::{Edge, EdgeKind};
pub use loader::GraphStore;
pub use query::{query, Direction, GraphHit, KindFilter, QueryRequest, QueryResponse};
