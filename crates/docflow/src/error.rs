use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocflowError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Job service error: {0}")]
    Api(#[from] ApiError),

    #[error("Preview error: {0}")]
    Preview(#[from] PreviewError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// Failures of a call against the job service.
///
/// The first four variants are the taxonomy views react to; the rest cover
/// responses that could not be classified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Rejected by job service: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Action not permitted in current state: {0}")]
    InvalidState(String),

    #[error("Unexpected HTTP status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// True for the "resource does not exist (yet)" class of failures.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreviewError {
    #[error("Row {row} has {actual} columns, expected {expected} to match headers")]
    DataIntegrity {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Row {row} has more than one validation for field '{field}'")]
    DuplicateValidation { row: usize, field: String },
}

pub type Result<T> = std::result::Result<T, DocflowError>;
