use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the usage-insights crates.
#[derive(Error, Debug)]
pub enum InsightError {
    /// Required input was empty or missing.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An intermediate result violated a precondition of a later analyzer.
    #[error("Logic error: {0}")]
    Logic(String),

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The input path holds no `.json` / `.jsonl` files.
    #[error("No usage files found in {0}")]
    NoInputFiles(PathBuf),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl InsightError {
    /// Shorthand for [`InsightError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        InsightError::Validation(msg.into())
    }

    /// Shorthand for [`InsightError::Logic`].
    pub fn logic(msg: impl Into<String>) -> Self {
        InsightError::Logic(msg.into())
    }
}

/// Convenience alias used throughout the usage-insights crates.
pub type Result<T> = std::result::Result<T, InsightError>;
