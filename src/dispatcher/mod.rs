//! Snapshot dispatch
//!
//! - `SnapshotModule` binds one backend to an executor and runs captures
//! - `Completion` enforces exactly-once delivery to the caller
//! - `SnapshotConfig` configures the process-wide module

pub mod completion;
pub mod config;
pub mod module;

pub use completion::Completion;
pub use config::SnapshotConfig;
pub use module::SnapshotModule;
