//! Persistent vector store using SQLite and sqlite-vec.
//!
//! One physical store exists per embedding model, in
//! `<root>/<safe model name>-<digest>/index.db`, so vectors of different widths never
//! share a table. The store records its width in `store_meta`; opening it
//! with an embedder of another width triggers an automatic rebuild.
use rusqlite::{Connection, OptionalExtension, params};
use sqlite_vec::sqlite3_vec_init;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use thiserror::Error;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::embedder::{Embedder, EmbedderError};

pub mod chunks;
pub mod models;
pub mod search;

pub use models::{InsertReport, RetrievedChunk, StoredSource};

/// File name of the index inside a model directory.
pub const INDEX_FILE: &str = "index.db";

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS store_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chunks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    fingerprint TEXT NOT NULL,
    source_path TEXT NOT NULL,
    position INTEGER NOT NULL,
    page INTEGER,
    content TEXT NOT NULL,
    ingested_at DATETIME NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chunks_fingerprint ON chunks(fingerprint);
"#;

static INIT_VEC: Once = Once::new();

/// Initialize the sqlite-vec extension. Safe to call multiple times.
fn init_sqlite_vec() {
    INIT_VEC.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite3_vec_init as *const (),
        )));
    });
}

/// Errors raised by the vector store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store directory error: {0}")]
    Io(#[from] std::io::Error),

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbedderError),

    #[error("embedding width mismatch: store expects {expected}, found {found:?}")]
    DimensionMismatch {
        expected: usize,
        found: Option<usize>,
    },
}

/// How [`VectorStore::open`] obtained its store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// An existing, compatible store was opened.
    Opened,
    /// No store existed; an empty one was created.
    Created,
    /// The existing store had an incompatible width and was replaced by an
    /// empty one.
    Rebuilt { found: Option<usize> },
}

/// Whether the store holds any chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Empty,
    Populated,
}

/// A vector index bound to one embedding model.
pub struct VectorStore {
    pub(crate) conn: Connection,
    pub(crate) embedder: Arc<dyn Embedder>,
    dir: PathBuf,
    dimensions: usize,
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("dir", &self.dir)
            .field("model", &self.embedder.model_name())
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl VectorStore {
    /// Open the store for `embedder`'s model under `root`, creating it if absent.
    ///
    /// A store built with a different embedding width is deleted and
    /// recreated empty. The rebuild is logged and reported through
    /// [`OpenOutcome::Rebuilt`]; it is not an error.
    pub fn open(root: &Path, embedder: Arc<dyn Embedder>) -> Result<(Self, OpenOutcome), StoreError> {
        let dir = store_dir_for_model(root, embedder.model_name());
        let existed = dir.join(INDEX_FILE).exists();
        std::fs::create_dir_all(&dir)?;

        match Self::open_at(&dir, embedder.clone()) {
            Ok(store) => {
                let outcome = if existed {
                    OpenOutcome::Opened
                } else {
                    OpenOutcome::Created
                };
                info!(
                    "Vector store {:?} for {} at {}",
                    outcome,
                    embedder.model_name(),
                    dir.display()
                );
                Ok((store, outcome))
            }
            Err(StoreError::DimensionMismatch { expected, found }) => {
                warn!(
                    expected,
                    ?found,
                    dir = %dir.display(),
                    "Embedding width changed, rebuilding vector store"
                );
                std::fs::remove_dir_all(&dir)?;
                std::fs::create_dir_all(&dir)?;
                let store = Self::open_at(&dir, embedder)?;
                Ok((store, OpenOutcome::Rebuilt { found }))
            }
            Err(e) => Err(e),
        }
    }

    /// Open the index inside `dir` without any recovery.
    pub fn open_at(dir: &Path, embedder: Arc<dyn Embedder>) -> Result<Self, StoreError> {
        init_sqlite_vec();

        let conn = Connection::open(dir.join(INDEX_FILE))?;
        let dimensions = embedder.dimensions();
        Self::init_schema(&conn, embedder.model_name(), dimensions)?;

        Ok(Self {
            conn,
            embedder,
            dir: dir.to_path_buf(),
            dimensions,
        })
    }

    /// Open a throwaway in-memory store (useful for testing).
    pub fn open_in_memory(embedder: Arc<dyn Embedder>) -> Result<Self, StoreError> {
        init_sqlite_vec();
        let conn = Connection::open_in_memory()?;
        let dimensions = embedder.dimensions();
        Self::init_schema(&conn, embedder.model_name(), dimensions)?;
        Ok(Self {
            conn,
            embedder,
            dir: PathBuf::from(":memory:"),
            dimensions,
        })
    }

    fn init_schema(conn: &Connection, model: &str, dimensions: usize) -> Result<(), StoreError> {
        let vec_version: String = conn.query_row("SELECT vec_version()", [], |row| row.get(0))?;
        debug!("sqlite-vec version: {}", vec_version);

        conn.execute_batch(SCHEMA_SQL)?;

        let recorded: Option<String> = conn
            .query_row(
                "SELECT value FROM store_meta WHERE key = 'dimensions'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        let has_vectors: bool = conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE name = 'vec_chunks')",
            [],
            |row| row.get(0),
        )?;

        match recorded.map(|v| v.parse::<usize>().ok()) {
            Some(Some(found)) if found == dimensions => Ok(()),
            Some(found) => Err(StoreError::DimensionMismatch {
                expected: dimensions,
                found,
            }),
            None if has_vectors => Err(StoreError::DimensionMismatch {
                expected: dimensions,
                found: None,
            }),
            None => {
                conn.execute_batch(&format!(
                    "CREATE VIRTUAL TABLE vec_chunks USING vec0(embedding FLOAT[{dimensions}]);"
                ))?;
                conn.execute(
                    "INSERT INTO store_meta (key, value) VALUES ('dimensions', ?1), ('embed_model', ?2)",
                    params![dimensions.to_string(), model],
                )?;
                Ok(())
            }
        }
    }

    /// Embedding width of every vector in this store.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Directory holding this store's index.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    pub fn state(&self) -> Result<StoreState, StoreError> {
        Ok(if self.chunk_count()? == 0 {
            StoreState::Empty
        } else {
            StoreState::Populated
        })
    }
}

/// Directory of the store for `model` under `root`.
///
/// Characters outside `[A-Za-z0-9._-]` become `_`, and the first 8 hex
/// characters of the raw name's SHA-256 are appended, so `org/embed:v1` and
/// `org_embed_v1` land in different directories.
#[must_use]
pub fn store_dir_for_model(root: &Path, model: &str) -> PathBuf {
    let safe: String = model
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let digest = hex::encode(Sha256::digest(model.as_bytes()));
    root.join(format!("{safe}-{}", &digest[..8]))
}

/// Helper to serialize a float32 vector into bytes for vec0 virtual table
pub fn serialize_vector(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}
