//! Error types and handling
//!
//! Failures of a snapshot attempt travel through the completion handler as
//! [`SnapshotError`]. Setup problems with the process-wide module are
//! reported separately as [`ModuleError`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a snapshot attempt failed
///
/// This set is closed: callers can match on it exhaustively.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotError {
    /// The active platform has no native capture. Never retried.
    #[error("snapshot capture is not implemented on this platform")]
    Unimplemented,

    /// The native capability ran and failed. The detail is passed through as-is.
    #[error("native snapshot failed: {0}")]
    NativeFailure(String),

    /// Reserved for option validation. Not produced by this crate today.
    #[error("invalid snapshot options: {0}")]
    InvalidOptions(String),
}

impl SnapshotError {
    /// Stable machine-readable code for this failure
    pub fn code(&self) -> &'static str {
        match self {
            SnapshotError::Unimplemented => "UNIMPLEMENTED",
            SnapshotError::NativeFailure(_) => "NATIVE_FAILURE",
            SnapshotError::InvalidOptions(_) => "INVALID_OPTIONS",
        }
    }

    /// Whether calling again could ever give a different outcome
    pub fn is_terminal(&self) -> bool {
        matches!(self, SnapshotError::Unimplemented)
    }
}

/// Errors from setting up the process-wide snapshot module
#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("snapshot module is already initialized")]
    AlreadyInitialized,

    #[error("failed to start snapshot runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Error response for bridge callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<SnapshotError> for ErrorResponse {
    fn from(error: SnapshotError) -> Self {
        ErrorResponse {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

impl From<ModuleError> for ErrorResponse {
    fn from(error: ModuleError) -> Self {
        let code = match &error {
            ModuleError::AlreadyInitialized => "ALREADY_INITIALIZED",
            ModuleError::Runtime(_) => "RUNTIME_ERROR",
            ModuleError::Config(_) => "CONFIG_ERROR",
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type alias using ModuleError
pub type ModuleResult<T> = Result<T, ModuleError>;
