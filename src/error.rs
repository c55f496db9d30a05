use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

/// Fatal errors that abort a validation run before a report is produced.
///
/// Per-file problems never surface here: they are recovered as scan warnings
/// (see [`crate::extract::ScanError`]) and rule violations become issues.
#[derive(Error, Debug)]
pub enum ValidateError {
    #[error("Project root not found: {0}")]
    RootNotFound(PathBuf),

    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Unknown module: {name} (known modules: {known})")]
    UnknownModule { name: String, known: String },

    #[error("Regex compilation error in {field}: {source}")]
    Regex {
        field: String,
        #[source]
        source: regex::Error,
    },

    #[error("Internal invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Validation run cancelled before completion")]
    Cancelled,

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ValidateError {
    /// Process exit code for this error.
    ///
    /// 2 for configuration problems, 3 for tool defects, 130 for an aborted run.
    pub fn exit_code(&self) -> u8 {
        match self {
            ValidateError::InvariantViolation(_) => 3,
            ValidateError::Cancelled => 130,
            _ => 2,
        }
    }
}

pub type Result<T> = std::result::Result<T, ValidateError>;
