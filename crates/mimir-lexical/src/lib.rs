//! Lexical retrieval for the Mimir indexer.
//!
//! An opaque key–value store over symbol IDs: chunks live in SQLite with
//! FTS5 for full-text lookup, and an optional Voyage embedding client
//! enriches the index with vectors when an API key is configured.

pub mod embedding;
pub mod store;

pub use embedding::EmbeddingClient;
pub use store::{LexicalHit, LexicalStore, StoreStats};
