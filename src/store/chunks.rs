use super::{InsertReport, StoreError, StoredSource, VectorStore, serialize_vector};
use crate::fingerprint::Fingerprint;
use crate::loader::DocumentChunk;
use chrono::{DateTime, Utc};
use rusqlite::params;
use rusqlite::types::Type;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

impl VectorStore {
    /// Returns the set of fingerprints that already have chunks in the store
    pub fn fingerprints(&self) -> Result<HashSet<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT DISTINCT fingerprint FROM chunks")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut set = HashSet::new();
        for row in rows {
            set.insert(row?);
        }
        Ok(set)
    }

    /// Total number of stored chunks
    pub fn chunk_count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Lists every stored source file, oldest first
    pub fn sources(&self) -> Result<Vec<StoredSource>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT source_path, fingerprint, COUNT(*), MIN(ingested_at)
            FROM chunks
            GROUP BY fingerprint, source_path
            ORDER BY MIN(ingested_at), source_path
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            let fingerprint: String = row.get(1)?;
            let fingerprint = Fingerprint::from_hex(&fingerprint).ok_or_else(|| {
                rusqlite::Error::InvalidColumnType(1, "fingerprint".to_string(), Type::Text)
            })?;
            Ok(StoredSource {
                source_path: row.get(0)?,
                fingerprint,
                chunk_count: row.get::<_, i64>(2)? as usize,
                first_ingested_at: row.get::<_, DateTime<Utc>>(3)?,
            })
        })?;

        let mut sources = Vec::new();
        for row in rows {
            sources.push(row?);
        }
        Ok(sources)
    }

    /// Inserts the chunks whose source content is not stored yet.
    ///
    /// Chunks are skipped when their fingerprint is already present, or when
    /// the same fingerprint was first seen under a different path earlier in
    /// this batch. If the fingerprint lookup fails it is treated as empty and
    /// the degradation is logged and flagged in the report.
    pub fn add_new_chunks(
        &mut self,
        chunks: &[DocumentChunk],
    ) -> Result<InsertReport, StoreError> {
        if chunks.is_empty() {
            return Ok(InsertReport::default());
        }
        let existing = self.fingerprints();
        self.insert_unseen(chunks, existing)
    }

    /// Dedup and insert `chunks` against the result of a fingerprint lookup.
    pub(crate) fn insert_unseen(
        &mut self,
        chunks: &[DocumentChunk],
        existing: Result<HashSet<String>, StoreError>,
    ) -> Result<InsertReport, StoreError> {
        let mut report = InsertReport {
            submitted: chunks.len(),
            ..InsertReport::default()
        };
        if chunks.is_empty() {
            return Ok(report);
        }

        let existing = match existing {
            Ok(set) => set,
            Err(e) => {
                warn!("Fingerprint lookup failed, assuming an empty store: {e}");
                report.degraded_lookup = true;
                HashSet::new()
            }
        };

        // fingerprint -> path that claimed it in this batch
        let mut claimed: HashMap<&str, &str> = HashMap::new();
        let mut fresh: Vec<&DocumentChunk> = Vec::new();
        for chunk in chunks {
            let fp = chunk.fingerprint.as_str();
            if existing.contains(fp) {
                report.skipped_existing += 1;
                continue;
            }
            let owner = *claimed.entry(fp).or_insert(chunk.source_path.as_str());
            if owner != chunk.source_path {
                report.skipped_duplicate += 1;
                continue;
            }
            fresh.push(chunk);
        }

        if fresh.is_empty() {
            debug!("Nothing new among {} chunks", chunks.len());
            return Ok(report);
        }

        let texts: Vec<&str> = fresh.iter().map(|c| c.content.as_str()).collect();
        let vectors = self.embedder.embed_batch(&texts)?;
        if vectors.len() != fresh.len() {
            return Err(crate::embedder::EmbedderError::CountMismatch {
                expected: fresh.len(),
                actual: vectors.len(),
            }
            .into());
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimensions()) {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimensions(),
                found: Some(bad.len()),
            });
        }

        let now = Utc::now();
        let tx = self.conn.transaction()?;
        for (chunk, vector) in fresh.iter().zip(&vectors) {
            tx.execute(
                "INSERT INTO chunks (fingerprint, source_path, position, page, content, ingested_at) VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    chunk.fingerprint.as_str(),
                    chunk.source_path,
                    chunk.position as i64,
                    chunk.page,
                    chunk.content,
                    now,
                ],
            )?;
            let chunk_id = tx.last_insert_rowid();

            tx.execute(
                "INSERT INTO vec_chunks (rowid, embedding) VALUES (?, ?)",
                params![chunk_id, serialize_vector(vector)],
            )?;
        }
        tx.commit()?;

        report.added = fresh.len();
        info!(
            added = report.added,
            skipped_existing = report.skipped_existing,
            skipped_duplicate = report.skipped_duplicate,
            "Inserted chunks into {}",
            self.model_name()
        );
        Ok(report)
    }
}
