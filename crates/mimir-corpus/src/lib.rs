//! Corpus walking and chunk extraction for the Mimir indexer.
//!
//! Walks a mod directory for C# sources and XML Def files, then cuts each
//! file into [`mimir_core::ChunkRecord`]s — one per type declaration, method,
//! or Def element — with canonical symbol IDs. The chunk stream feeds both
//! the lexical index and the knowledge-graph builder.

pub mod chunker;
pub mod walker;

use std::path::Path;

use mimir_core::{ChunkRecord, MimirError};

/// Walk `root` and chunk every discovered file in one pass.
///
/// # Errors
///
/// Returns [`MimirError::Io`] if the corpus root cannot be read. Individual
/// unparseable files are logged and skipped.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use mimir_corpus::chunk_dir;
///
/// let chunks = chunk_dir(Path::new("Mods/MyMod")).unwrap();
/// println!("{} chunks", chunks.len());
/// ```
pub fn chunk_dir(root: &Path) -> Result<Vec<ChunkRecord>, MimirError> {
    let files = walker::walk_corpus(root)?;
    Ok(chunker::chunk_corpus(&files))
}
