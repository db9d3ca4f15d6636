//! Retrieval-augmented lesson-plan generation.
//!
//! [`LessonPlanGenerator::generate`] retrieves the chunks most similar to the
//! course title, places them in a fixed prompt contract and asks the language
//! model for a Markdown lesson plan.
pub mod prompts;
pub mod retriever;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::llm::{ChatRequest, LanguageModel, LlmError};
use crate::store::StoreError;
pub use retriever::{Retriever, StoreRetriever};

/// Query used when the course title is blank.
pub const FALLBACK_QUERY: &str = "lesson";

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("invalid lesson request: {0}")]
    InvalidRequest(String),

    #[error("retrieval failed: {0}")]
    Retrieval(#[from] StoreError),

    #[error("vector store lock poisoned")]
    LockPoisoned,

    #[error("language model failed: {0}")]
    Llm(#[from] LlmError),
}

/// Audience the lesson is written for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum AcademicLevel {
    #[default]
    Undergrad,
    Postgrad,
}

impl fmt::Display for AcademicLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AcademicLevel::Undergrad => "Undergrad",
            AcademicLevel::Postgrad => "Postgrad",
        })
    }
}

impl FromStr for AcademicLevel {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "undergrad" | "undergraduate" => Ok(AcademicLevel::Undergrad),
            "postgrad" | "postgraduate" => Ok(AcademicLevel::Postgrad),
            other => Err(GenerationError::InvalidRequest(format!(
                "unknown academic level: {other}"
            ))),
        }
    }
}

/// Session template with default length, group work and quiz settings.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum Preset {
    #[default]
    Lecture,
    Lab,
    Seminar,
    Workshop,
}

/// Values a [`Preset`] fills into a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PresetDefaults {
    pub preset: Preset,
    pub lesson_minutes: u32,
    pub group_work: bool,
    pub include_quiz: bool,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::Lecture,
        Preset::Lab,
        Preset::Seminar,
        Preset::Workshop,
    ];

    #[must_use]
    pub fn defaults(self) -> PresetDefaults {
        let (lesson_minutes, group_work, include_quiz) = match self {
            Preset::Lecture => (90, false, false),
            Preset::Lab => (120, true, true),
            Preset::Seminar => (60, true, false),
            Preset::Workshop => (180, true, true),
        };
        PresetDefaults {
            preset: self,
            lesson_minutes,
            group_work,
            include_quiz,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Preset::Lecture => "Lecture",
            Preset::Lab => "Lab",
            Preset::Seminar => "Seminar",
            Preset::Workshop => "Workshop",
        })
    }
}

impl FromStr for Preset {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|p| p.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| GenerationError::InvalidRequest(format!("unknown preset: {}", s.trim())))
    }
}

/// Parameters of one lesson plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonRequest {
    pub course_title: String,
    pub level: AcademicLevel,
    pub preset: Preset,
    pub lesson_minutes: u32,
    pub group_work: bool,
    pub include_quiz: bool,
    pub temperature: f32,
}

impl LessonRequest {
    /// A request whose length, group work and quiz come from `preset`.
    #[must_use]
    pub fn from_preset(
        course_title: impl Into<String>,
        level: AcademicLevel,
        preset: Preset,
        temperature: f32,
    ) -> Self {
        let defaults = preset.defaults();
        Self {
            course_title: course_title.into(),
            level,
            preset,
            lesson_minutes: defaults.lesson_minutes,
            group_work: defaults.group_work,
            include_quiz: defaults.include_quiz,
            temperature,
        }
    }

    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.lesson_minutes == 0 {
            return Err(GenerationError::InvalidRequest(
                "lesson_minutes must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(GenerationError::InvalidRequest(format!(
                "temperature must be between 0 and 1, got {}",
                self.temperature
            )));
        }
        Ok(())
    }

    /// Retrieval query: the course title, or [`FALLBACK_QUERY`] when blank.
    #[must_use]
    pub fn query(&self) -> &str {
        let title = self.course_title.trim();
        if title.is_empty() { FALLBACK_QUERY } else { title }
    }
}

/// A generated plan and the files its context came from.
#[derive(Debug, Clone, Serialize)]
pub struct LessonPlan {
    pub markdown: String,
    /// Distinct source paths of the retrieved chunks, in rank order.
    pub sources: Vec<String>,
    pub context_chunks: usize,
}

/// Drafts lesson plans with a language model over retrieved context.
pub struct LessonPlanGenerator {
    model: Arc<dyn LanguageModel>,
}

impl LessonPlanGenerator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub fn generate(
        &self,
        request: &LessonRequest,
        retriever: &dyn Retriever,
    ) -> Result<LessonPlan, GenerationError> {
        request.validate()?;

        let query = request.query();
        let chunks = retriever.retrieve(query)?;
        info!("Retrieved {} chunks for query {:?}", chunks.len(), query);

        let context = chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut sources: Vec<String> = Vec::new();
        for chunk in &chunks {
            if !sources.contains(&chunk.source_path) {
                sources.push(chunk.source_path.clone());
            }
        }

        let chat = ChatRequest {
            system: prompts::SYSTEM_PROMPT.to_string(),
            user: prompts::lesson_prompt(request, &context),
            temperature: request.temperature,
        };
        let markdown = self.model.complete(&chat)?;

        Ok(LessonPlan {
            markdown,
            sources,
            context_chunks: chunks.len(),
        })
    }
}
