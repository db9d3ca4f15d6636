use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::fingerprint::Fingerprint;

/// Outcome of a deduplicated insert.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct InsertReport {
    /// Chunks handed to the insert.
    pub submitted: usize,
    /// Chunks embedded and written.
    pub added: usize,
    /// Chunks dropped because their fingerprint was already stored.
    pub skipped_existing: usize,
    /// Chunks dropped because the same content arrived earlier in the batch
    /// under another path.
    pub skipped_duplicate: usize,
    /// The existing-fingerprint lookup failed and was treated as empty.
    pub degraded_lookup: bool,
}

/// A file whose chunks are present in the store.
#[derive(Debug, Clone, Serialize)]
pub struct StoredSource {
    pub source_path: String,
    pub fingerprint: Fingerprint,
    pub chunk_count: usize,
    pub first_ingested_at: DateTime<Utc>,
}

/// A chunk returned by similarity search.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub chunk_id: i64,
    pub content: String,
    pub source_path: String,
    pub fingerprint: String,
    pub position: usize,
    pub page: Option<u32>,
    pub similarity: f64,
}
