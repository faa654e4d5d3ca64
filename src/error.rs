//! Error types for the sorting engine.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for sorting, undo and rollback operations.
#[derive(Error, Debug)]
pub enum SortError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Recycle bin error: {0}")]
    Trash(#[from] trash::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Condition on \"{attribute}\" must take a {expected} value, got {found}")]
    TypeMismatch {
        attribute: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Invalid operator: {0}")]
    InvalidOperator(String),

    #[error("Invalid condition attribute: {0}")]
    InvalidAttribute(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Overwriting existing file is not supported: {0}")]
    OverwriteNotSupported(PathBuf),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("All rules must share one action type when every rule has to match")]
    InconsistentActionTypes,
}

/// A specialized Result type for sorting operations.
pub type Result<T> = std::result::Result<T, SortError>;
