use std::sync::{Arc, Mutex};

use super::GenerationError;
use crate::store::{RetrievedChunk, VectorStore};

/// Top-K similarity search over stored chunk text and metadata.
pub trait Retriever: Send + Sync {
    fn retrieve(&self, query: &str) -> Result<Vec<RetrievedChunk>, GenerationError>;
}

/// Retriever over the shared vector store.
///
/// The store lock is held only for the duration of one search.
#[derive(Clone)]
pub struct StoreRetriever {
    store: Arc<Mutex<VectorStore>>,
    top_k: usize,
}

impl StoreRetriever {
    pub fn new(store: Arc<Mutex<VectorStore>>, top_k: usize) -> Self {
        Self { store, top_k }
    }
}

impl Retriever for StoreRetriever {
    fn retrieve(&self, query: &str) -> Result<Vec<RetrievedChunk>, GenerationError> {
        let store = self
            .store
            .lock()
            .map_err(|_| GenerationError::LockPoisoned)?;
        Ok(store.search(query, self.top_k)?)
    }
}
