//! Custom error types for translation operations

use thiserror::Error;

/// Translation-related errors
#[derive(Error, Debug)]
pub enum TranslationError {
    /// API request failed with a non-success status
    #[error("API request failed with status {status}: {message}")]
    ApiError {
        status: u16,
        message: String,
    },

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limit exceeded: {message}")]
    RateLimitError {
        message: String,
    },

    /// Character quota of the account is used up (HTTP 456)
    #[error("Quota exceeded: {message}")]
    QuotaExceededError {
        message: String,
    },

    /// Network error
    #[error("Network error: {message}")]
    NetworkError {
        message: String,
    },

    /// Invalid response from API
    #[error("Invalid response: {message}")]
    InvalidResponseError {
        message: String,
    },

    /// Request timeout
    #[error("Request timeout")]
    TimeoutError,

    /// Every attempt failed with a retryable error
    #[error("failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<TranslationError>,
    },

    /// File operation error
    #[error("File error: {path} - {message}")]
    FileError {
        path: String,
        message: String,
    },

    /// Job source does not exist
    #[error("source not found: {path}")]
    SourceNotFound {
        path: String,
    },

    /// Neither the job nor the config names a target language
    #[error("target_lang is not specified for job {job} or globally")]
    MissingTargetLanguage {
        job: String,
    },

    /// Exclude pattern could not be compiled
    #[error("invalid exclude pattern '{pattern}': {message}")]
    InvalidExcludePattern {
        pattern: String,
        message: String,
    },

    /// Invalid file format
    #[error("Invalid file format: {format}")]
    InvalidFormat {
        format: String,
    },

    /// Wrapper for anyhow errors
    #[error("Internal error: {0}")]
    InternalError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Reqwest error
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl TranslationError {
    /// Whether another attempt at the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslationError::RateLimitError { .. }
            | TranslationError::NetworkError { .. }
            | TranslationError::TimeoutError => true,
            TranslationError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Build the error for a non-200 response
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            456 => TranslationError::QuotaExceededError { message },
            429 => TranslationError::RateLimitError { message },
            _ => TranslationError::ApiError { status, message },
        }
    }
}

impl From<anyhow::Error> for TranslationError {
    fn from(err: anyhow::Error) -> Self {
        TranslationError::InternalError(err.to_string())
    }
}

/// Result type for translation operations
pub type Result<T> = std::result::Result<T, TranslationError>;
