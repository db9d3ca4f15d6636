//! HTTP front end.
//!
//! | Route | Purpose |
//! |---|---|
//! | `GET /` | Lesson form page |
//! | `GET /api/presets` | Preset defaults and academic levels |
//! | `POST /api/lessons` | Multipart form: parameters plus files; returns the plan |
//! | `GET /health` | Liveness check |
//!
//! Uploads are written to a scratch directory that lives until the
//! submission finishes. Ingestion and generation run on a blocking thread.
use std::path::Path;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::generator::{AcademicLevel, GenerationError, LessonRequest, Preset, PresetDefaults};
use crate::loader::SourceFile;
use crate::render::markdown_to_html;
use crate::service::{LessonService, ServiceError};
use crate::store::InsertReport;

/// Largest accepted multipart body.
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

const INDEX_HTML: &str = include_str!("page.html");

#[derive(Clone)]
struct AppState {
    service: Arc<LessonService>,
}

/// Build the application router around `service`.
pub fn router(service: Arc<LessonService>) -> Router {
    Router::new()
        .route("/", get(handle_index))
        .route("/api/presets", get(handle_presets))
        .route("/api/lessons", post(handle_create_lesson))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(AppState { service })
}

/// Serve on `bind` until Ctrl-C.
pub async fn serve(service: Arc<LessonService>, bind: &str) -> anyhow::Result<()> {
    let app = router(service);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Lesson planner listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

// ============ Errors ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn internal(code: &'static str, message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code,
        message: message.into(),
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        if err.is_invalid_request() {
            return bad_request(err.to_string());
        }
        error!("Lesson request failed: {err}");
        let code = match &err {
            ServiceError::Generation(GenerationError::Llm(_)) | ServiceError::Llm(_) => "llm_error",
            ServiceError::Store(_) | ServiceError::Generation(GenerationError::Retrieval(_)) => {
                "store_error"
            }
            _ => "internal_error",
        };
        internal(code, err.to_string())
    }
}

impl From<GenerationError> for AppError {
    fn from(err: GenerationError) -> Self {
        ServiceError::from(err).into()
    }
}

// ============ GET / ============

async fn handle_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    embed_model: String,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        embed_model: state.service.config().embed_model.clone(),
    })
}

// ============ GET /api/presets ============

#[derive(Serialize)]
struct PresetsResponse {
    presets: Vec<PresetDefaults>,
    levels: [AcademicLevel; 2],
    default_temperature: f32,
}

async fn handle_presets(State(state): State<AppState>) -> Json<PresetsResponse> {
    Json(PresetsResponse {
        presets: Preset::ALL.iter().map(|p| p.defaults()).collect(),
        levels: [AcademicLevel::Undergrad, AcademicLevel::Postgrad],
        default_temperature: state.service.config().default_temperature,
    })
}

// ============ POST /api/lessons ============

#[derive(Serialize)]
struct LessonResponse {
    markdown: String,
    html: String,
    warnings: Vec<String>,
    ingest: InsertReport,
    sources: Vec<String>,
}

/// Text fields of the lesson form. Missing fields fall back to the preset.
#[derive(Debug, Default)]
struct LessonForm {
    course_title: Option<String>,
    level: Option<String>,
    preset: Option<String>,
    lesson_minutes: Option<String>,
    group_work: Option<String>,
    include_quiz: Option<String>,
    temperature: Option<String>,
}

impl LessonForm {
    fn set(&mut self, name: &str, value: String) {
        let slot = match name {
            "course_title" => &mut self.course_title,
            "level" => &mut self.level,
            "preset" => &mut self.preset,
            "lesson_minutes" => &mut self.lesson_minutes,
            "group_work" => &mut self.group_work,
            "include_quiz" => &mut self.include_quiz,
            "temperature" => &mut self.temperature,
            _ => return,
        };
        let value = value.trim();
        if !value.is_empty() {
            *slot = Some(value.to_string());
        }
    }

    fn into_request(self, default_temperature: f32) -> Result<LessonRequest, GenerationError> {
        let preset = match self.preset {
            Some(p) => p.parse()?,
            None => Preset::default(),
        };
        let level = match self.level {
            Some(l) => l.parse()?,
            None => AcademicLevel::default(),
        };
        let temperature = match self.temperature {
            Some(t) => t.parse::<f32>().map_err(|_| {
                GenerationError::InvalidRequest(format!("temperature is not a number: {t}"))
            })?,
            None => default_temperature,
        };

        let mut request =
            LessonRequest::from_preset(self.course_title.unwrap_or_default(), level, preset, temperature);
        if let Some(m) = self.lesson_minutes {
            request.lesson_minutes = m.parse().map_err(|_| {
                GenerationError::InvalidRequest(format!("lesson_minutes is not a whole number: {m}"))
            })?;
        }
        if let Some(flag) = self.group_work {
            request.group_work = parse_flag("group_work", &flag)?;
        }
        if let Some(flag) = self.include_quiz {
            request.include_quiz = parse_flag("include_quiz", &flag)?;
        }
        Ok(request)
    }
}

fn parse_flag(field: &str, value: &str) -> Result<bool, GenerationError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(GenerationError::InvalidRequest(format!(
            "{field} must be true or false, got {value}"
        ))),
    }
}

/// Final path component of an uploaded file name, or `None` if nothing usable remains.
fn upload_name(raw: &str) -> Option<String> {
    let normalized = raw.replace('\\', "/");
    let name = Path::new(&normalized).file_name()?.to_string_lossy().trim().to_string();
    (!name.is_empty()).then_some(name)
}

async fn handle_create_lesson(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<LessonResponse>, AppError> {
    let scratch = tempfile::tempdir()
        .map_err(|e| internal("internal_error", format!("cannot create upload directory: {e}")))?;
    let mut form = LessonForm::default();
    let mut files: Vec<SourceFile> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("malformed multipart body: {e}")))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        if field_name == "files" {
            let Some(name) = field.file_name().and_then(upload_name) else {
                continue;
            };
            let bytes = field
                .bytes()
                .await
                .map_err(|e| bad_request(format!("failed to read upload {name}: {e}")))?;
            let path = scratch.path().join(format!("{}-{}", files.len(), name));
            tokio::fs::write(&path, &bytes)
                .await
                .map_err(|e| internal("internal_error", format!("cannot store upload {name}: {e}")))?;
            files.push(SourceFile::named(path, name));
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| bad_request(format!("failed to read field {field_name}: {e}")))?;
            form.set(&field_name, value);
        }
    }

    let request = form.into_request(state.service.config().default_temperature)?;
    request.validate()?;
    info!(
        "Lesson request {:?} ({}, {} min) with {} uploads",
        request.course_title,
        request.preset,
        request.lesson_minutes,
        files.len()
    );

    let service = state.service.clone();
    let submission = tokio::task::spawn_blocking(move || {
        let result = service.submit(&request, &files);
        drop(scratch);
        result
    })
    .await
    .map_err(|e| internal("internal_error", format!("worker failed: {e}")))??;

    let html = markdown_to_html(&submission.plan.markdown);
    Ok(Json(LessonResponse {
        markdown: submission.plan.markdown,
        html,
        warnings: submission.ingest.warnings,
        ingest: submission.ingest.report,
        sources: submission.plan.sources,
    }))
}
