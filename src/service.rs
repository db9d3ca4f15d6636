//! Orchestration shared by the CLI and the web server.
//!
//! A [`LessonService`] owns the configuration, the vector store of the
//! configured embedding model, the document loader and the generator. The
//! store sits behind a mutex, so concurrent submissions insert one at a time;
//! the lock is released before the language model is called.
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::embedder::mock::MockEmbedder;
use crate::embedder::ollama::OllamaEmbedder;
use crate::embedder::{Embedder, EmbedderError};
use crate::generator::{
    GenerationError, LessonPlan, LessonPlanGenerator, LessonRequest, StoreRetriever,
};
use crate::llm::{LanguageModel, LlmError, OllamaChat};
use crate::loader::{DocumentLoader, SourceFile, TextSplitter};
use crate::store::{InsertReport, OpenOutcome, RetrievedChunk, StoreError, StoredSource, VectorStore};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("embedder setup failed: {0}")]
    Embedder(#[from] EmbedderError),

    #[error("language model setup failed: {0}")]
    Llm(#[from] LlmError),

    #[error("vector store lock poisoned")]
    LockPoisoned,
}

impl ServiceError {
    /// Whether the caller supplied bad input, as opposed to a backend failure.
    #[must_use]
    pub fn is_invalid_request(&self) -> bool {
        matches!(
            self,
            ServiceError::Generation(GenerationError::InvalidRequest(_))
        )
    }
}

/// Result of ingesting a batch of files.
#[derive(Debug, Default, Clone, Serialize)]
pub struct IngestSummary {
    pub report: InsertReport,
    /// One message per file that could not be parsed.
    pub warnings: Vec<String>,
}

/// Result of an ingest-then-generate submission.
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub plan: LessonPlan,
    pub ingest: IngestSummary,
}

pub struct LessonService {
    config: Arc<Config>,
    store: Arc<Mutex<VectorStore>>,
    loader: DocumentLoader,
    generator: LessonPlanGenerator,
    retriever: StoreRetriever,
    open_outcome: OpenOutcome,
}

impl LessonService {
    /// Build a service from explicit backends.
    pub fn new(
        config: Arc<Config>,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn LanguageModel>,
    ) -> Result<Self, ServiceError> {
        let (store, open_outcome) = VectorStore::open(&config.store_root(), embedder)?;
        let store = Arc::new(Mutex::new(store));

        Ok(Self {
            loader: DocumentLoader::new(TextSplitter::new(config.chunk_size, config.chunk_overlap)),
            generator: LessonPlanGenerator::new(model),
            retriever: StoreRetriever::new(store.clone(), config.search_top_k),
            store,
            config,
            open_outcome,
        })
    }

    /// Build a service talking to the configured Ollama server.
    ///
    /// With `mock_embeddings` the deterministic [`MockEmbedder`] replaces the
    /// embedding model, under its own store partition.
    pub fn connect(config: Arc<Config>, mock_embeddings: bool) -> Result<Self, ServiceError> {
        let timeout = config.request_timeout();
        let embedder: Arc<dyn Embedder> = if mock_embeddings {
            Arc::new(MockEmbedder::new(config.embed_dimensions.unwrap_or(384)))
        } else {
            Arc::new(OllamaEmbedder::new(
                &config.ollama_base_url,
                &config.embed_model,
                config.embed_dimensions,
                timeout,
            )?)
        };
        let model: Arc<dyn LanguageModel> = Arc::new(OllamaChat::new(
            &config.ollama_base_url,
            &config.llm_model,
            timeout,
        )?);

        info!(
            "Using embedding model {} and chat model {}",
            embedder.model_name(),
            model.model_name()
        );
        Self::new(config, embedder, model)
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// How the store was obtained when this service started.
    #[must_use]
    pub fn open_outcome(&self) -> OpenOutcome {
        self.open_outcome
    }

    fn lock_store(&self) -> Result<MutexGuard<'_, VectorStore>, ServiceError> {
        self.store.lock().map_err(|_| ServiceError::LockPoisoned)
    }

    /// Load, chunk and insert `files`. Unparsable files become warnings.
    pub fn ingest(&self, files: &[SourceFile]) -> Result<IngestSummary, ServiceError> {
        let outcome = self.loader.load_sources(files);
        let report = self.lock_store()?.add_new_chunks(&outcome.chunks)?;
        Ok(IngestSummary {
            report,
            warnings: outcome.warnings,
        })
    }

    /// Generate a plan from the chunks already stored.
    pub fn generate(&self, request: &LessonRequest) -> Result<LessonPlan, ServiceError> {
        Ok(self.generator.generate(request, &self.retriever)?)
    }

    /// Ingest `files`, then generate a plan for `request`.
    ///
    /// The request is validated before anything is ingested.
    pub fn submit(
        &self,
        request: &LessonRequest,
        files: &[SourceFile],
    ) -> Result<Submission, ServiceError> {
        request.validate()?;
        let ingest = self.ingest(files)?;
        let plan = self.generate(request)?;
        Ok(Submission { plan, ingest })
    }

    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>, ServiceError> {
        Ok(self.lock_store()?.search(query, top_k)?)
    }

    pub fn sources(&self) -> Result<Vec<StoredSource>, ServiceError> {
        Ok(self.lock_store()?.sources()?)
    }

    pub fn chunk_count(&self) -> Result<usize, ServiceError> {
        Ok(self.lock_store()?.chunk_count()?)
    }
}
