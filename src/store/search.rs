use super::{RetrievedChunk, StoreError, VectorStore, serialize_vector};
use tracing::debug;

fn map_search_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RetrievedChunk> {
    let distance: f64 = row.get(6)?;
    let similarity = 1.0 - (distance / 2.0);

    Ok(RetrievedChunk {
        chunk_id: row.get(0)?,
        content: row.get(1)?,
        source_path: row.get(2)?,
        fingerprint: row.get(3)?,
        position: row.get::<_, i64>(4)? as usize,
        page: row.get(5)?,
        similarity,
    })
}

impl VectorStore {
    /// Embed `query` with this store's model and return the `top_k` nearest chunks.
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>, StoreError> {
        let vector = self.embedder.embed(query)?;
        self.search_vector(&vector, top_k)
    }

    /// Perform vector similarity search using cosine distance, nearest first
    pub fn search_vector(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, StoreError> {
        if query_vector.len() != self.dimensions() {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimensions(),
                found: Some(query_vector.len()),
            });
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                c.id,
                c.content,
                c.source_path,
                c.fingerprint,
                c.position,
                c.page,
                vec_distance_cosine(v.embedding, ?) as distance
            FROM vec_chunks v
            JOIN chunks c ON v.rowid = c.id
            ORDER BY distance ASC, c.id ASC
            LIMIT ?
            "#,
        )?;

        let rows = stmt.query_map(
            rusqlite::params![serialize_vector(query_vector), top_k as i64],
            map_search_row,
        )?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        debug!("Search returned {} of top {}", results.len(), top_k);
        Ok(results)
    }
}
