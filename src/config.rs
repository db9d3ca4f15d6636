/// Configuration module for lessonrag.
///
/// Handles loading, validating, and providing default configuration values.
/// Values come from (in increasing priority) built-in defaults, an optional
/// JSON file, a local `.env` file, and the process environment.
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Config file looked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "lessonrag.json";

// ── Default value functions ──────────────────────────────────────────

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_llm_model() -> String {
    "gpt-oss:20b".to_string()
}

fn default_embed_model() -> String {
    "nomic-embed-text:v1.5".to_string()
}

fn default_store_dir() -> String {
    "lesson_store".to_string()
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_search_top_k() -> usize {
    6
}

fn default_temperature() -> f32 {
    0.2
}

fn default_bind() -> String {
    "127.0.0.1:7860".to_string()
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_ollama_base_url")]
    pub ollama_base_url: String,

    /// Chat model tag served by Ollama.
    #[serde(default = "default_llm_model")]
    pub llm_model: String,

    /// Embedding model tag served by Ollama. Also names the store partition.
    #[serde(default = "default_embed_model")]
    pub embed_model: String,

    /// Embedding width. When unset the model is probed once at startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed_dimensions: Option<usize>,

    /// Root directory holding one vector index per embedding model.
    #[serde(default = "default_store_dir")]
    pub store_dir: String,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    #[serde(default = "default_search_top_k")]
    pub search_top_k: usize,

    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// HTTP timeout for embedding and chat calls. Unset means wait forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            ollama_base_url: default_ollama_base_url(),
            llm_model: default_llm_model(),
            embed_model: default_embed_model(),
            embed_dimensions: None,
            store_dir: default_store_dir(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            search_top_k: default_search_top_k(),
            default_temperature: default_temperature(),
            request_timeout_secs: None,
            server: ServerConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration for this process.
    ///
    /// If `config_path` is `None`, [`DEFAULT_CONFIG_FILE`] is used when it
    /// exists. An explicit path that does not exist, an unreadable file, a
    /// malformed file, or an unparsable environment value is an error: the
    /// caller is expected to abort startup.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut cfg = match config_path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {
                info!("{DEFAULT_CONFIG_FILE} not found, using defaults");
                Self::default()
            }
        };

        // A missing .env is the common case.
        if let Ok(path) = dotenv::dotenv() {
            info!("Loaded environment from {}", path.display());
        }

        cfg.apply_env_with(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        let cfg: Config = serde_json::from_str(&data)
            .with_context(|| format!("invalid JSON in {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Ok(cfg)
    }

    /// Apply environment overrides read through `lookup`.
    ///
    /// Empty values are ignored. Numeric values that do not parse are errors.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("OLLAMA_BASE_URL") {
            self.ollama_base_url = v;
        }
        if let Some(v) = get("LLM_MODEL") {
            self.llm_model = v;
        }
        if let Some(v) = get("OLLAMA_EMBED_MODEL") {
            self.embed_model = v;
        }
        if let Some(v) = get("VECTOR_STORE_DIR") {
            self.store_dir = v;
        }
        if let Some(v) = get("EMBED_DIMENSIONS") {
            let dims = v
                .trim()
                .parse::<usize>()
                .with_context(|| format!("EMBED_DIMENSIONS is not a number: {v}"))?;
            self.embed_dimensions = Some(dims);
        }
        if let Some(v) = get("SEARCH_TOP_K") {
            self.search_top_k = v
                .trim()
                .parse::<usize>()
                .with_context(|| format!("SEARCH_TOP_K is not a number: {v}"))?;
        }
        if let Some(v) = get("LESSONRAG_BIND") {
            self.server.bind = v;
        }
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.chunk_size > 0, "chunk_size must be positive");
        anyhow::ensure!(
            self.chunk_overlap < self.chunk_size,
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            self.chunk_overlap,
            self.chunk_size
        );
        anyhow::ensure!(self.search_top_k > 0, "search_top_k must be positive");
        anyhow::ensure!(
            !self.ollama_base_url.trim().is_empty(),
            "ollama_base_url must not be empty"
        );
        anyhow::ensure!(!self.llm_model.trim().is_empty(), "llm_model must not be empty");
        anyhow::ensure!(
            !self.embed_model.trim().is_empty(),
            "embed_model must not be empty"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.default_temperature),
            "default_temperature must be within [0, 1]"
        );
        if let Some(dims) = self.embed_dimensions {
            anyhow::ensure!(dims > 0, "embed_dimensions must be positive");
        }
        Ok(())
    }

    /// Root directory of the vector store partitions.
    #[must_use]
    pub fn store_root(&self) -> PathBuf {
        PathBuf::from(&self.store_dir)
    }

    /// HTTP timeout for model calls, if one is configured.
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
