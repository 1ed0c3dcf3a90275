use std::path::PathBuf;

/// Errors that can occur across the Mimir platform.
///
/// Each variant wraps a specific error domain. Library crates use this type
/// directly; the binary crate converts to `anyhow::Error` at the boundary.
///
/// # Examples
///
/// ```
/// use mimir_core::MimirError;
///
/// let err = MimirError::Config("missing corpus path".into());
/// assert!(err.to_string().contains("missing corpus path"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum MimirError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Source code parsing failure.
    #[error("parse error: {0}")]
    Parse(String),

    /// XML parsing failure.
    #[error("XML error: {0}")]
    Xml(String),

    /// Corrupt or incompatible on-disk graph artefact (bad magic, version
    /// mismatch, truncation).
    #[error("artefact error: {0}")]
    Artifact(String),

    /// Lexical index database failure.
    #[error("database error: {0}")]
    Database(String),

    /// Embedding API or response error.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}
