//! Core types, configuration, and error handling for the Mimir platform.
//!
//! This crate provides the shared foundation used by all other Mimir crates:
//! - [`MimirError`] — unified error type using `thiserror`
//! - [`MimirConfig`] — configuration loaded from `.mimir.toml`
//! - Shared types: [`ChunkRecord`], [`ChunkLanguage`]

mod config;
mod error;
mod types;

pub use config::{EmbeddingConfig, IndexConfig, MimirConfig, NamespaceRule, ResolutionMode};
pub use error::MimirError;
pub use types::{ChunkLanguage, ChunkRecord};

/// A convenience `Result` type for Mimir operations.
pub type Result<T> = std::result::Result<T, MimirError>;
