//! Shared utilities

pub mod error;

pub use error::{ErrorResponse, ModuleError, ModuleResult, SnapshotError};
