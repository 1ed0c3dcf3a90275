//! SQLite + FTS5 storage for chunks, keyed by canonical symbol ID.
//!
//! The store is the lexical side of retrieval: `get` answers `get_item`
//! requests by exact symbol ID, FTS5 backs full-text search over symbol
//! names and source, and an optional BLOB column holds embedding vectors.

use std::path::{Path, PathBuf};

use mimir_core::{ChunkLanguage, ChunkRecord, MimirError};
use rusqlite::{params, Connection};
use sha2::{Digest, Sha256};

/// A chunk returned from a lexical search, with its relevance score.
///
/// # Examples
///
/// ```
/// use mimir_lexical::store::LexicalHit;
/// # use std::path::PathBuf;
/// # use mimir_core::{ChunkLanguage, ChunkRecord};
///
/// let hit = LexicalHit {
///     chunk: ChunkRecord {
///         id: "Verse.Pawn".into(),
///         language: ChunkLanguage::Code,
///         text: "public class Pawn { }".into(),
///         symbol_name: "Pawn".into(),
///         def_type: None,
///         span_start: 0,
///         span_end: 21,
///         path: PathBuf::from("Source/Pawn.cs"),
///     },
///     score: 1.5,
/// };
/// assert_eq!(hit.chunk.symbol_name, "Pawn");
/// ```
#[derive(Debug, Clone)]
pub struct LexicalHit {
    /// The matched chunk.
    pub chunk: ChunkRecord,
    /// Relevance score (higher is better).
    pub score: f64,
}

/// Store statistics.
#[derive(Debug, Clone, Copy)]
pub struct StoreStats {
    /// Total chunks stored.
    pub total_chunks: usize,
    /// Chunks carrying an embedding vector.
    pub embedded_chunks: usize,
}

/// SQLite-backed lexical index over symbol IDs.
///
/// # Examples
///
/// ```
/// use mimir_lexical::store::LexicalStore;
///
/// let store = LexicalStore::in_memory().unwrap();
/// assert_eq!(store.stats().unwrap().total_chunks, 0);
/// ```
pub struct LexicalStore {
    conn: Connection,
}

impl LexicalStore {
    /// Open or create a store at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`MimirError::Database`] if the database cannot be opened.
    pub fn open(path: &Path) -> Result<Self, MimirError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                MimirError::Database(format!("failed to create index directory: {e}"))
            })?;
        }
        let conn = Connection::open(path)
            .map_err(|e| MimirError::Database(format!("failed to open database: {e}")))?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`MimirError::Database`] if schema creation fails.
    pub fn in_memory() -> Result<Self, MimirError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            MimirError::Database(format!("failed to create in-memory database: {e}"))
        })?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), MimirError> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS chunks (
                    symbol_id TEXT PRIMARY KEY,
                    symbol_name TEXT NOT NULL,
                    language TEXT NOT NULL,
                    def_type TEXT,
                    path TEXT NOT NULL,
                    span_start INTEGER NOT NULL,
                    span_end INTEGER NOT NULL,
                    content TEXT NOT NULL,
                    content_hash TEXT NOT NULL,
                    embedding BLOB
                );

                CREATE VIRTUAL TABLE IF NOT EXISTS chunks_fts USING fts5(
                    symbol_id, symbol_name, content,
                    content='chunks', content_rowid='rowid'
                );

                -- Triggers to keep FTS in sync
                CREATE TRIGGER IF NOT EXISTS chunks_ai AFTER INSERT ON chunks BEGIN
                    INSERT INTO chunks_fts(rowid, symbol_id, symbol_name, content)
                    VALUES (new.rowid, new.symbol_id, new.symbol_name, new.content);
                END;

                CREATE TRIGGER IF NOT EXISTS chunks_ad AFTER DELETE ON chunks BEGIN
                    INSERT INTO chunks_fts(chunks_fts, rowid, symbol_id, symbol_name, content)
                    VALUES ('delete', old.rowid, old.symbol_id, old.symbol_name, old.content);
                END;

                CREATE TRIGGER IF NOT EXISTS chunks_au AFTER UPDATE ON chunks BEGIN
                    INSERT INTO chunks_fts(chunks_fts, rowid, symbol_id, symbol_name, content)
                    VALUES ('delete', old.rowid, old.symbol_id, old.symbol_name, old.content);
                    INSERT INTO chunks_fts(rowid, symbol_id, symbol_name, content)
                    VALUES (new.rowid, new.symbol_id, new.symbol_name, new.content);
                END;
                ",
            )
            .map_err(|e| MimirError::Database(format!("failed to create schema: {e}")))?;
        Ok(())
    }

    /// Insert or replace a chunk, with an optional embedding vector.
    ///
    /// # Errors
    ///
    /// Returns [`MimirError::Database`] on insert failure.
    pub fn insert_chunk(
        &self,
        chunk: &ChunkRecord,
        embedding: Option<&[f32]>,
    ) -> Result<(), MimirError> {
        let embedding_bytes = embedding.map(floats_to_bytes);
        self.conn
            .execute(
                "INSERT OR REPLACE INTO chunks
                 (symbol_id, symbol_name, language, def_type, path,
                  span_start, span_end, content, content_hash, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    chunk.id,
                    chunk.symbol_name,
                    chunk.language.to_string(),
                    chunk.def_type,
                    chunk.path.to_string_lossy().to_string(),
                    chunk.span_start as i64,
                    chunk.span_end as i64,
                    chunk.text,
                    content_hash(&chunk.text),
                    embedding_bytes,
                ],
            )
            .map_err(|e| MimirError::Database(format!("failed to insert chunk: {e}")))?;
        Ok(())
    }

    /// Batch insert chunks without embeddings.
    ///
    /// # Errors
    ///
    /// Returns [`MimirError::Database`] on insert failure.
    pub fn insert_chunks(&self, chunks: &[ChunkRecord]) -> Result<(), MimirError> {
        for chunk in chunks {
            self.insert_chunk(chunk, None)?;
        }
        Ok(())
    }

    /// Fetch a chunk by exact symbol ID.
    ///
    /// # Errors
    ///
    /// Returns [`MimirError::Database`] on query failure.
    pub fn get(&self, symbol_id: &str) -> Result<Option<ChunkRecord>, MimirError> {
        let result = self.conn.query_row(
            "SELECT symbol_id, symbol_name, language, def_type, path,
                    span_start, span_end, content
             FROM chunks WHERE symbol_id = ?1",
            params![symbol_id],
            row_to_chunk,
        );
        match result {
            Ok(chunk) => Ok(Some(chunk)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(MimirError::Database(format!(
                "failed to get chunk '{symbol_id}': {e}"
            ))),
        }
    }

    /// Full-text search over symbol names and source via FTS5.
    ///
    /// # Errors
    ///
    /// Returns [`MimirError::Database`] on query failure.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<LexicalHit>, MimirError> {
        let safe_query = sanitize_fts_query(query);
        if safe_query.is_empty() {
            return Ok(Vec::new());
        }

        let mut stmt = self
            .conn
            .prepare(
                "SELECT c.symbol_id, c.symbol_name, c.language, c.def_type, c.path,
                        c.span_start, c.span_end, c.content, rank
                 FROM chunks_fts f
                 JOIN chunks c ON c.rowid = f.rowid
                 WHERE chunks_fts MATCH ?1
                 ORDER BY rank
                 LIMIT ?2",
            )
            .map_err(|e| MimirError::Database(format!("failed to prepare FTS query: {e}")))?;

        let rows = stmt
            .query_map(params![safe_query, limit as i64], |row| {
                let rank: f64 = row.get(8)?;
                let chunk = row_to_chunk(row)?;
                // FTS5 rank is negative (more negative = more relevant)
                Ok(LexicalHit {
                    chunk,
                    score: (-rank).max(0.0),
                })
            })
            .map_err(|e| MimirError::Database(format!("FTS query failed: {e}")))?;

        let mut hits = Vec::new();
        for row in rows {
            hits.push(row.map_err(|e| MimirError::Database(format!("failed to read row: {e}")))?);
        }
        Ok(hits)
    }

    /// Attach an embedding vector to an existing chunk.
    ///
    /// # Errors
    ///
    /// Returns [`MimirError::Database`] on update failure.
    pub fn set_embedding(&self, symbol_id: &str, embedding: &[f32]) -> Result<(), MimirError> {
        self.conn
            .execute(
                "UPDATE chunks SET embedding = ?2 WHERE symbol_id = ?1",
                params![symbol_id, floats_to_bytes(embedding)],
            )
            .map_err(|e| MimirError::Database(format!("failed to set embedding: {e}")))?;
        Ok(())
    }

    /// Store statistics.
    ///
    /// # Errors
    ///
    /// Returns [`MimirError::Database`] on query failure.
    pub fn stats(&self) -> Result<StoreStats, MimirError> {
        let total_chunks: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
            .map_err(|e| MimirError::Database(format!("failed to count chunks: {e}")))?;
        let embedded_chunks: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM chunks WHERE embedding IS NOT NULL",
                [],
                |row| row.get(0),
            )
            .map_err(|e| MimirError::Database(format!("failed to count embeddings: {e}")))?;
        Ok(StoreStats {
            total_chunks: total_chunks as usize,
            embedded_chunks: embedded_chunks as usize,
        })
    }
}

fn row_to_chunk(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChunkRecord> {
    let language: String = row.get(2)?;
    Ok(ChunkRecord {
        id: row.get(0)?,
        symbol_name: row.get(1)?,
        language: if language == "xml" {
            ChunkLanguage::Xml
        } else {
            ChunkLanguage::Code
        },
        def_type: row.get(3)?,
        path: PathBuf::from(row.get::<_, String>(4)?),
        span_start: row.get::<_, i64>(5)? as usize,
        span_end: row.get::<_, i64>(6)? as usize,
        text: row.get(7)?,
    })
}

fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn floats_to_bytes(floats: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(floats.len() * 4);
    for f in floats {
        bytes.extend_from_slice(&f.to_le_bytes());
    }
    bytes
}

fn sanitize_fts_query(query: &str) -> String {
    // Split into words, wrap each in quotes for exact matching
    let words: Vec<String> = query
        .split_whitespace()
        .map(|w| {
            let clean: String = w
                .chars()
                .filter(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            format!("\"{clean}\"")
        })
        .filter(|w| w != "\"\"")
        .collect();
    words.join(" OR ")
}
