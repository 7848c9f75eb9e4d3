//! Core data models for translation

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Target languages for which the API is asked for a more formal tone
const FORMALITY_LANGUAGES: &[&str] = &[
    "DE", "FR", "IT", "ES", "NL", "PL", "PT-PT", "PT-BR", "RU", "JA",
];

/// Formality level sent with a translation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Formality {
    /// Heightened formality
    More,
}

impl Formality {
    /// Formality to request for a target language, if the language supports one
    pub fn for_language(target_lang: &str) -> Option<Self> {
        let upper = target_lang.to_ascii_uppercase();
        FORMALITY_LANGUAGES
            .contains(&upper.as_str())
            .then_some(Formality::More)
    }
}

/// A declared unit of work: one file or a directory tree
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Job {
    pub source: PathBuf,
    pub destination: PathBuf,
    #[serde(default)]
    pub target_lang: Option<String>,
    #[serde(default)]
    pub source_lang: Option<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Job {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            ..Default::default()
        }
    }

    pub fn with_target_lang(mut self, target_lang: impl Into<String>) -> Self {
        self.target_lang = Some(target_lang.into());
        self
    }

    pub fn with_source_lang(mut self, source_lang: impl Into<String>) -> Self {
        self.source_lang = Some(source_lang.into());
        self
    }

    pub fn with_exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude.push(pattern.into());
        self
    }
}

/// One file to translate; the unit handed to a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
    pub target_lang: String,
}

impl Task {
    pub fn new(
        source_path: impl Into<PathBuf>,
        dest_path: impl Into<PathBuf>,
        target_lang: impl Into<String>,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            dest_path: dest_path.into(),
            target_lang: target_lang.into(),
        }
    }
}

/// Request body of the translate endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateRequest {
    pub text: Vec<String>,
    pub target_lang: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formality: Option<Formality>,
}

impl TranslateRequest {
    pub fn new(text: Vec<String>, target_lang: impl Into<String>) -> Self {
        let target_lang = target_lang.into();
        let formality = Formality::for_language(&target_lang);
        Self {
            text,
            target_lang,
            formality,
        }
    }
}

/// A single translated text in a successful response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Translation {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_source_language: Option<String>,
}

/// Successful response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub translations: Vec<Translation>,
}

/// Error response body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub message: String,
}
