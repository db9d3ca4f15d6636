//! Document loading: format dispatch, fingerprinting and chunking.
//!
//! [`DocumentLoader::load_and_chunk`] processes a batch of uploaded files.
//! A file that cannot be read or parsed never aborts the batch: it becomes a
//! warning message and the remaining files are still processed.
pub mod docx;
pub mod pdf;
pub mod splitter;
pub mod text;

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::fingerprint::Fingerprint;
pub use splitter::TextSplitter;

/// Errors that make a single file unusable.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("Word extraction failed: {0}")]
    Docx(String),

    #[error("not valid UTF-8 text: {0}")]
    Encoding(std::str::Utf8Error),
}

impl LoadError {
    /// Short failure category shown to users.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            LoadError::Io(_) => "io",
            LoadError::Pdf(_) => "pdf",
            LoadError::Docx(_) => "docx",
            LoadError::Encoding(_) => "encoding",
        }
    }
}

/// Parser selected for a file, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    /// `.doc` and `.docx`
    Word,
    /// Fallback for every other extension.
    PlainText,
}

impl DocumentFormat {
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => DocumentFormat::Pdf,
            "doc" | "docx" => DocumentFormat::Word,
            _ => DocumentFormat::PlainText,
        }
    }

    /// Extract the text units of `path` using this format's parser.
    pub fn extract(self, path: &Path) -> Result<Vec<ExtractedUnit>, LoadError> {
        match self {
            DocumentFormat::Pdf => pdf::extract_pdf(path),
            DocumentFormat::Word => docx::extract_docx(path),
            DocumentFormat::PlainText => text::extract_text(path),
        }
    }
}

/// A unit of text as produced by a parser, before splitting.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedUnit {
    pub text: String,
    /// 1-based page number for paginated formats.
    pub page: Option<u32>,
}

impl ExtractedUnit {
    #[must_use]
    pub fn whole(text: String) -> Self {
        Self { text, page: None }
    }

    #[must_use]
    pub fn page(text: String, page: u32) -> Self {
        Self {
            text,
            page: Some(page),
        }
    }
}

/// A bounded span of text ready for embedding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentChunk {
    pub content: String,
    pub fingerprint: Fingerprint,
    pub source_path: String,
    /// Index of this chunk among the chunks of its source file.
    pub position: usize,
    pub page: Option<u32>,
}

/// Result of loading a batch of files.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub chunks: Vec<DocumentChunk>,
    pub warnings: Vec<String>,
}

/// Loads and chunks files with a fixed splitter.
#[derive(Debug, Clone, Default)]
pub struct DocumentLoader {
    splitter: TextSplitter,
}

impl DocumentLoader {
    #[must_use]
    pub fn new(splitter: TextSplitter) -> Self {
        Self { splitter }
    }

    /// Load every file in `paths`, collecting chunks and per-file warnings.
    pub fn load_and_chunk<P: AsRef<Path>>(&self, paths: &[P]) -> LoadOutcome {
        let sources: Vec<SourceFile> = paths.iter().map(SourceFile::from_path).collect();
        self.load_sources(&sources)
    }

    /// Like [`load_and_chunk`](Self::load_and_chunk), recording each file
    /// under its [`SourceFile::name`].
    pub fn load_sources(&self, sources: &[SourceFile]) -> LoadOutcome {
        let mut outcome = LoadOutcome::default();

        for source in sources {
            match self.load_named(&source.path, &source.name) {
                Ok(chunks) => {
                    info!("Loaded {} chunks from {}", chunks.len(), source.name);
                    outcome.chunks.extend(chunks);
                }
                Err(e) => {
                    warn!("Could not parse {}: {e}", source.path.display());
                    outcome.warnings.push(parse_warning(&source.name, &e));
                }
            }
        }

        outcome
    }

    /// Fingerprint, parse and split one file.
    pub fn load_file(&self, path: &Path) -> Result<Vec<DocumentChunk>, LoadError> {
        self.load_named(path, &normalize_path(path))
    }

    fn load_named(&self, path: &Path, source_path: &str) -> Result<Vec<DocumentChunk>, LoadError> {
        let fingerprint = Fingerprint::of_file(path)?;
        let units = DocumentFormat::from_path(path).extract(path)?;

        let mut chunks = Vec::new();
        for unit in units {
            for content in self.splitter.split(&unit.text) {
                chunks.push(DocumentChunk {
                    content,
                    fingerprint: fingerprint.clone(),
                    source_path: source_path.to_string(),
                    position: chunks.len(),
                    page: unit.page,
                });
            }
        }
        Ok(chunks)
    }
}

/// A file to load and the path recorded for its chunks.
///
/// Uploads are written to scratch files; `name` keeps the name the user gave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub name: String,
}

impl SourceFile {
    /// Record the file under its own path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        Self {
            path: path.to_path_buf(),
            name: normalize_path(path),
        }
    }

    pub fn named(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }
}

/// Forward slashes on every platform so stored paths compare equal.
fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn parse_warning(source_name: &str, err: &LoadError) -> String {
    let name = Path::new(source_name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| source_name.to_string());
    format!(
        "Could not parse {name} ({}). Try re-saving the file as PDF or DOCX.",
        err.category()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_format_dispatch() {
        assert_eq!(DocumentFormat::from_path(Path::new("a.PDF")), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::from_path(Path::new("b.docx")), DocumentFormat::Word);
        assert_eq!(DocumentFormat::from_path(Path::new("c.doc")), DocumentFormat::Word);
        assert_eq!(DocumentFormat::from_path(Path::new("d.md")), DocumentFormat::PlainText);
        assert_eq!(DocumentFormat::from_path(Path::new("README")), DocumentFormat::PlainText);
    }

    #[test]
    fn test_partial_failure_isolation() {
        let dir = tempdir().unwrap();
        let good_a = dir.path().join("week1.txt");
        let bad = dir.path().join("slides.pdf");
        let good_b = dir.path().join("week2.md");
        fs::write(&good_a, "Cells are the basic unit of life.").unwrap();
        fs::write(&bad, "definitely not a pdf").unwrap();
        fs::write(&good_b, "Mitochondria produce ATP.").unwrap();

        let loader = DocumentLoader::default();
        let outcome = loader.load_and_chunk(&[&good_a, &bad, &good_b]);

        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("slides.pdf"));
        assert!(outcome.warnings[0].contains("(pdf)"));

        let sources: Vec<&str> = outcome.chunks.iter().map(|c| c.source_path.as_str()).collect();
        assert_eq!(outcome.chunks.len(), 2);
        assert!(sources[0].ends_with("week1.txt"));
        assert!(sources[1].ends_with("week2.md"));
    }

    #[test]
    fn test_missing_file_is_warning() {
        let dir = tempdir().unwrap();
        let outcome = DocumentLoader::default().load_and_chunk(&[dir.path().join("gone.txt")]);
        assert!(outcome.chunks.is_empty());
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("(io)"));
    }

    #[test]
    fn test_chunks_tagged_with_fingerprint() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reading.txt");
        fs::write(&path, "x".repeat(2500)).unwrap();

        let loader = DocumentLoader::new(TextSplitter::new(1000, 200));
        let chunks = loader.load_file(&path).unwrap();
        let expected = Fingerprint::of_file(&path).unwrap();

        assert_eq!(chunks.len(), 3);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.fingerprint, expected);
            assert_eq!(chunk.position, i);
            assert_eq!(chunk.page, None);
            assert!(chunk.source_path.ends_with("reading.txt"));
        }
    }

    #[test]
    fn test_empty_file_yields_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blank.txt");
        fs::write(&path, "\n\n   \n").unwrap();

        let outcome = DocumentLoader::default().load_and_chunk(&[&path]);
        assert!(outcome.chunks.is_empty());
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_named_sources_keep_given_name() {
        let dir = tempdir().unwrap();
        let scratch = dir.path().join("0-syllabus.txt");
        let broken = dir.path().join("1-old.pdf");
        fs::write(&scratch, "Week 1: introduction.").unwrap();
        fs::write(&broken, "garbage").unwrap();

        let outcome = DocumentLoader::default().load_sources(&[
            SourceFile::named(&scratch, "syllabus.txt"),
            SourceFile::named(&broken, "old.pdf"),
        ]);
        assert_eq!(outcome.chunks.len(), 1);
        assert_eq!(outcome.chunks[0].source_path, "syllabus.txt");
        assert!(outcome.warnings[0].starts_with("Could not parse old.pdf (pdf)"));
    }
}
