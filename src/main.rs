//! # lessonrag CLI
//!
//! - `lessonrag serve` - Start the web form on the configured address
//! - `lessonrag ingest <FILES>...` - Add course documents to the vector store
//! - `lessonrag generate <TITLE>` - Draft a lesson plan from stored documents
//! - `lessonrag search <QUERY>` - Show the chunks retrieved for a query
//! - `lessonrag sources` - List the documents in the store
//!
//! ```bash
//! lessonrag ingest week1.pdf week2.docx
//! lessonrag generate "Cell Biology" --preset lab --level postgrad --output plan.md
//! lessonrag --mock-embeddings serve --bind 0.0.0.0:7860
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lessonrag::config::Config;
use lessonrag::generator::{AcademicLevel, LessonRequest, Preset};
use lessonrag::loader::SourceFile;
use lessonrag::render::markdown_to_html;
use lessonrag::service::LessonService;
use lessonrag::store::OpenOutcome;
use lessonrag::web;

#[derive(Parser)]
#[command(name = "lessonrag")]
#[command(about = "Retrieval-augmented lesson plan generator")]
#[command(version)]
struct Cli {
    /// Path to a JSON config file (default: ./lessonrag.json if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Use deterministic offline embeddings instead of Ollama
    #[arg(long, global = true)]
    mock_embeddings: bool,

    /// Output format (text, json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the lesson form over HTTP
    Serve {
        /// Address to bind (overrides config)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Ingest documents into the vector store
    Ingest {
        /// PDF, DOCX or text files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Generate a lesson plan
    Generate {
        /// Course or unit title, also used as the retrieval query
        title: String,

        #[arg(short, long, value_enum, default_value_t = AcademicLevel::Undergrad)]
        level: AcademicLevel,

        #[arg(short, long, value_enum, default_value_t = Preset::Lecture)]
        preset: Preset,

        /// Lesson length in minutes (default: from preset)
        #[arg(short, long)]
        minutes: Option<u32>,

        /// Include a group-work activity (default: from preset)
        #[arg(long)]
        group_work: Option<bool>,

        /// Include a 10-question quiz (default: from preset)
        #[arg(long)]
        quiz: Option<bool>,

        /// Sampling temperature in [0, 1] (default: from config)
        #[arg(short, long)]
        temperature: Option<f32>,

        /// Files to ingest before generating
        #[arg(short, long = "file")]
        files: Vec<PathBuf>,

        /// Write the plan here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Render HTML instead of Markdown
        #[arg(long)]
        html: bool,
    },

    /// Show the chunks retrieved for a query
    Search {
        query: String,

        /// Maximum results (default: search_top_k from config)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// List stored documents
    Sources,
}

#[derive(Serialize)]
struct IngestOutput<'a> {
    added: usize,
    skipped_existing: usize,
    skipped_duplicate: usize,
    warnings: &'a [String],
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = Arc::new(Config::load(cli.config.as_deref()).context("Failed to load configuration")?);
    let service = Arc::new(
        LessonService::connect(config.clone(), cli.mock_embeddings)
            .context("Failed to start lesson service")?,
    );
    if let OpenOutcome::Rebuilt { .. } = service.open_outcome() {
        eprintln!("Note: the vector store was rebuilt for a new embedding width; re-ingest your documents.");
    }

    match cli.command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to start async runtime")?;
            // `service` outlives the runtime: the blocking HTTP clients it owns
            // must not be dropped from async context.
            runtime.block_on(web::serve(service.clone(), &bind))?;
        }

        Commands::Ingest { files } => {
            let sources: Vec<SourceFile> = files.iter().map(SourceFile::from_path).collect();
            let summary = service.ingest(&sources)?;
            match cli.format {
                OutputFormat::Json => {
                    let output = IngestOutput {
                        added: summary.report.added,
                        skipped_existing: summary.report.skipped_existing,
                        skipped_duplicate: summary.report.skipped_duplicate,
                        warnings: &summary.warnings,
                    };
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Text => {
                    println!(
                        "Added {} chunks ({} already stored, {} duplicate uploads)",
                        summary.report.added,
                        summary.report.skipped_existing,
                        summary.report.skipped_duplicate
                    );
                    for warning in &summary.warnings {
                        eprintln!("warning: {warning}");
                    }
                }
            }
        }

        Commands::Generate {
            title,
            level,
            preset,
            minutes,
            group_work,
            quiz,
            temperature,
            files,
            output,
            html,
        } => {
            let mut request = LessonRequest::from_preset(
                title,
                level,
                preset,
                temperature.unwrap_or(config.default_temperature),
            );
            if let Some(m) = minutes {
                request.lesson_minutes = m;
            }
            if let Some(g) = group_work {
                request.group_work = g;
            }
            if let Some(q) = quiz {
                request.include_quiz = q;
            }

            let sources: Vec<SourceFile> = files.iter().map(SourceFile::from_path).collect();
            let submission = service.submit(&request, &sources)?;
            for warning in &submission.ingest.warnings {
                eprintln!("warning: {warning}");
            }

            let text = match (cli.format, html) {
                (OutputFormat::Json, _) => serde_json::to_string_pretty(&submission)?,
                (OutputFormat::Text, true) => markdown_to_html(&submission.plan.markdown),
                (OutputFormat::Text, false) => submission.plan.markdown,
            };
            write_output(output.as_deref(), &text)?;
        }

        Commands::Search { query, limit } => {
            let results = service.search(&query, limit.unwrap_or(config.search_top_k))?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
                OutputFormat::Text => {
                    if results.is_empty() {
                        println!("No results found.");
                    }
                    for (i, r) in results.iter().enumerate() {
                        let page = r.page.map(|p| format!(" p.{p}")).unwrap_or_default();
                        println!(
                            "{}. {}{} (similarity {:.3})",
                            i + 1,
                            r.source_path,
                            page,
                            r.similarity
                        );
                        println!("   {}", truncate(&r.content, 200));
                    }
                }
            }
        }

        Commands::Sources => {
            let sources = service.sources()?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&sources)?),
                OutputFormat::Text => {
                    println!("{} documents in {}", sources.len(), config.embed_model);
                    for s in &sources {
                        println!(
                            "{}  {:>4} chunks  {}  {}",
                            s.fingerprint.short(),
                            s.chunk_count,
                            s.first_ingested_at.format("%Y-%m-%d %H:%M"),
                            s.source_path
                        );
                    }
                }
            }
        }
    }

    Ok(())
}

fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote lesson plan to {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn truncate(s: &str, max_chars: usize) -> String {
    let flat = s.replace('\n', " ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}
