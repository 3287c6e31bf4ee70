//! Error types for tasktree
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, invalid config, unknown local id)
//! - 4: Operation failed (task API unreachable, rejected, not found)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the tasktree CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for tasktree operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Task not in current snapshot: {0}")]
    TaskNotFound(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    // Task API failures (exit code 4)
    #[error("Task API unreachable: {0}")]
    Transport(String),

    #[error("Task API rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Task API has no record of {0}")]
    NotFound(String),

    #[error("Task API response could not be decoded: {0}")]
    Decode(String),

    // Local operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::TaskNotFound(_)
            | Error::ConfigNotFound(_) => exit_codes::USER_ERROR,

            // Operation failures
            Error::Transport(_)
            | Error::Rejected { .. }
            | Error::NotFound(_)
            | Error::Decode(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// True when the failure was reported by (or on the way to) the task API.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::Rejected { .. } | Error::NotFound(_) | Error::Decode(_)
        )
    }

    /// Structured detail payload for machine-readable output.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::Rejected { status, message } => Some(serde_json::json!({
                "status": status,
                "message": message,
            })),
            Error::NotFound(id) | Error::TaskNotFound(id) => {
                Some(serde_json::json!({ "id": id }))
            }
            Error::InvalidConfig(message) | Error::InvalidArgument(message) => {
                Some(serde_json::json!({ "message": message }))
            }
            Error::ConfigNotFound(path) => Some(serde_json::json!({
                "path": path.to_string_lossy(),
            })),
            _ => None,
        }
    }
}

/// Result type alias for tasktree operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
