/// End-to-end integration tests for the lessonrag pipeline.
///
/// Tests the complete flow:
///   Config → Loader → Vector store → Retriever → Generator
use lessonrag::config::Config;
use lessonrag::embedder::Embedder;
use lessonrag::embedder::mock::MockEmbedder;
use lessonrag::fingerprint::Fingerprint;
use lessonrag::generator::{AcademicLevel, LessonRequest, Preset};
use lessonrag::llm::{ChatRequest, LanguageModel, LlmError};
use lessonrag::loader::{DocumentLoader, SourceFile};
use lessonrag::service::LessonService;
use lessonrag::store::{OpenOutcome, store_dir_for_model};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

/// 50-char sentence; 50 repetitions split into exactly 3 default-sized chunks.
const SENTENCE: &str = "Enzymes lower the activation energy of reactions. ";

struct ScriptedModel {
    prompts: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    fn new() -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
        }
    }
}

impl LanguageModel for ScriptedModel {
    fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(request.clone());
        Ok("## 1 Overview\n\nStudents will explore enzymes.\n\n## 2 Intended Learning Outcomes\n\n- Explain catalysis *Understand*".to_string())
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

fn config_for(root: &Path) -> Arc<Config> {
    Arc::new(Config {
        store_dir: root.join("store").to_string_lossy().into_owned(),
        ..Config::default()
    })
}

fn service_with(root: &Path, embedder: MockEmbedder) -> (LessonService, Arc<ScriptedModel>) {
    let model = Arc::new(ScriptedModel::new());
    let service = LessonService::new(config_for(root), Arc::new(embedder), model.clone()).unwrap();
    (service, model)
}

/// Upload → dedup → re-upload → generate
#[test]
fn test_end_to_end_reupload_adds_nothing() {
    let temp_dir = tempdir().unwrap();
    let doc = temp_dir.path().join("enzymes.txt");
    fs::write(&doc, SENTENCE.repeat(50)).unwrap();

    // The document splits into 3 chunks with default settings
    let chunks = DocumentLoader::default().load_file(&doc).unwrap();
    assert_eq!(chunks.len(), 3, "expected 3 chunks");

    let (service, model) = service_with(temp_dir.path(), MockEmbedder::named("nomic-embed-text:v1.5", 64));
    assert_eq!(service.open_outcome(), OpenOutcome::Created);

    let request = LessonRequest::from_preset("Enzymes", AcademicLevel::Undergrad, Preset::Lecture, 0.2);

    // 1. First upload adds all chunks
    let first = service.submit(&request, &[SourceFile::from_path(&doc)]).unwrap();
    assert_eq!(first.ingest.report.added, 3);
    assert!(first.ingest.warnings.is_empty());
    assert_eq!(service.chunk_count().unwrap(), 3);

    // 2. Same file again, plus a renamed copy: nothing new
    let copy = temp_dir.path().join("enzymes-copy.txt");
    fs::copy(&doc, &copy).unwrap();
    let second = service
        .submit(
            &request,
            &[SourceFile::from_path(&doc), SourceFile::from_path(&copy)],
        )
        .unwrap();
    assert_eq!(second.ingest.report.added, 0);
    assert_eq!(second.ingest.report.skipped_existing, 6);
    assert_eq!(service.chunk_count().unwrap(), 3);

    // 3. Generation saw the stored context
    assert!(second.plan.markdown.starts_with("## 1 Overview"));
    assert_eq!(second.plan.context_chunks, 3);
    assert_eq!(second.plan.sources.len(), 1);
    assert!(second.plan.sources[0].ends_with("enzymes.txt"));

    let prompts = model.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].user.contains("activation energy"));
    assert!(prompts[1].user.contains("**Course / Unit**: Enzymes"));
}

/// 3 files, 1 unreadable → chunks from 2 files and 1 warning
#[test]
fn test_partial_failure_isolation() {
    let temp_dir = tempdir().unwrap();
    let a = temp_dir.path().join("week1.md");
    let b = temp_dir.path().join("slides.pdf");
    let c = temp_dir.path().join("week2.txt");
    fs::write(&a, "# Week 1\n\nIntroduction to kinetics.").unwrap();
    fs::write(&b, "corrupted upload").unwrap();
    fs::write(&c, "Michaelis-Menten model.").unwrap();

    let (service, _) = service_with(temp_dir.path(), MockEmbedder::new(32));
    let summary = service
        .ingest(&[
            SourceFile::from_path(&a),
            SourceFile::from_path(&b),
            SourceFile::from_path(&c),
        ])
        .unwrap();

    assert_eq!(summary.report.added, 2);
    assert_eq!(summary.warnings.len(), 1);
    assert!(summary.warnings[0].contains("slides.pdf"));

    let sources = service.sources().unwrap();
    assert_eq!(sources.len(), 2);
    assert!(sources.iter().all(|s| !s.source_path.ends_with("slides.pdf")));
}

/// A store built with another embedding width is rebuilt empty
#[test]
fn test_self_heal_on_width_change() {
    let temp_dir = tempdir().unwrap();
    let doc = temp_dir.path().join("notes.txt");
    fs::write(&doc, "Competitive inhibitors bind the active site.").unwrap();

    {
        let (service, _) = service_with(temp_dir.path(), MockEmbedder::named("embed", 64));
        service.ingest(&[SourceFile::from_path(&doc)]).unwrap();
        assert_eq!(service.chunk_count().unwrap(), 1);
    }

    let (service, _) = service_with(temp_dir.path(), MockEmbedder::named("embed", 32));
    assert_eq!(
        service.open_outcome(),
        OpenOutcome::Rebuilt { found: Some(64) }
    );
    assert_eq!(service.chunk_count().unwrap(), 0);

    // The rebuilt store accepts the same document again
    let summary = service.ingest(&[SourceFile::from_path(&doc)]).unwrap();
    assert_eq!(summary.report.added, 1);
}

/// Different embedding models never share a store
#[test]
fn test_stores_partitioned_by_model() {
    let temp_dir = tempdir().unwrap();
    let doc = temp_dir.path().join("notes.txt");
    fs::write(&doc, "Allosteric regulation changes enzyme shape.").unwrap();

    let (service_a, _) = service_with(temp_dir.path(), MockEmbedder::named("model-a", 32));
    service_a.ingest(&[SourceFile::from_path(&doc)]).unwrap();

    let (service_b, _) = service_with(temp_dir.path(), MockEmbedder::named("model-b", 32));
    assert_eq!(service_b.open_outcome(), OpenOutcome::Created);
    assert!(service_b.sources().unwrap().is_empty());
    assert!(service_b.search("enzyme", 6).unwrap().is_empty());

    assert_eq!(service_a.sources().unwrap().len(), 1);
    let root = temp_dir.path().join("store");
    let dir_a = store_dir_for_model(&root, "model-a");
    let dir_b = store_dir_for_model(&root, "model-b");
    assert_ne!(dir_a, dir_b);
    assert!(dir_a.exists());
    assert!(dir_b.exists());
}

#[test]
fn test_fingerprint_ignores_file_name() {
    let temp_dir = tempdir().unwrap();
    let a = temp_dir.path().join("a.pdf");
    let b = temp_dir.path().join("renamed.docx");
    fs::write(&a, b"same bytes").unwrap();
    fs::write(&b, b"same bytes").unwrap();

    assert_eq!(Fingerprint::of_file(&a).unwrap(), Fingerprint::of_file(&b).unwrap());

    fs::write(&b, b"same bytez").unwrap();
    assert_ne!(Fingerprint::of_file(&a).unwrap(), Fingerprint::of_file(&b).unwrap());
}

#[test]
fn test_config_defaults_and_validation() {
    let config = Config::default();
    assert_eq!(config.chunk_size, 1000);
    assert_eq!(config.chunk_overlap, 200);
    assert_eq!(config.search_top_k, 6);
    assert!(config.validate().is_ok());

    let bad = Config {
        chunk_overlap: 1000,
        ..Config::default()
    };
    assert!(bad.validate().is_err());
}

#[test]
fn test_mock_embedder_consistency() {
    let embedder = MockEmbedder::default();
    let v1 = embedder.embed("lesson plan").unwrap();
    let v2 = embedder.embed("lesson plan").unwrap();
    assert_eq!(v1, v2, "mock embeddings should be deterministic");
    assert_eq!(v1.len(), embedder.dimensions());
}
