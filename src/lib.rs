//! # lessonrag — Retrieval-Augmented Lesson Planner
//!
//! Ingests course documents (PDF, DOCX, plain text) into a local vector
//! store and drafts structured Markdown lesson plans with a language model,
//! grounded in the most relevant passages.
//!
//! ## Architecture
//!
//! - **[`config`]** — Configuration loading (JSON file, `.env`, environment) and validation
//! - **[`fingerprint`]** — SHA-256 content fingerprints used for deduplication
//! - **[`loader`]** — Format dispatch, text extraction and overlapping chunking
//! - **[`embedder`]** — Text embedding via Ollama, or a deterministic mock
//! - **[`store`]** — SQLite + sqlite-vec store, one partition per embedding model
//! - **[`llm`]** — Chat completion via Ollama
//! - **[`generator`]** — Lesson parameters, retrieval and the prompt contract
//! - **[`service`]** — Ingest-then-generate orchestration shared by CLI and web
//! - **[`render`]** — Markdown to HTML preview
//! - **[`web`]** — axum form server

pub mod config;
pub mod embedder;
pub mod fingerprint;
pub mod generator;
pub mod llm;
pub mod loader;
pub mod render;
pub mod service;
pub mod store;
pub mod web;
