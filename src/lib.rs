//! Video Snapshot - grab a still frame from a video source.
//!
//! One operation, the same on every platform: [`snapshot`] takes options and
//! a completion handler, returns immediately, and calls the handler exactly
//! once with a [`SnapshotResult`]. Which implementation answers is fixed at
//! build time; see [`active_capability`].

pub mod dispatcher;
pub mod snapshot;
pub mod utils;

use dispatcher::{Completion, SnapshotConfig, SnapshotModule};
use snapshot::PlatformBackend;
use std::sync::OnceLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use snapshot::{CapabilityDescriptor, SnapshotOptions, SnapshotPayload, SnapshotResult};
pub use utils::error::{ErrorResponse, ModuleError, SnapshotError};

static MODULE: OnceLock<SnapshotModule<PlatformBackend>> = OnceLock::new();

/// Install a tracing subscriber. Does nothing if one is already set.
pub fn init_logging() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "video_snapshot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Initialize the process-wide snapshot module
///
/// Can only succeed once. Without it, the first snapshot call initializes
/// the module from `VIDEO_SNAPSHOT_*` environment variables.
pub fn init(config: SnapshotConfig) -> Result<(), ModuleError> {
    if MODULE.get().is_some() {
        return Err(ModuleError::AlreadyInitialized);
    }

    let module = build_module(&config)?;
    MODULE.set(module).map_err(|_| ModuleError::AlreadyInitialized)
}

fn build_module(config: &SnapshotConfig) -> Result<SnapshotModule<PlatformBackend>, ModuleError> {
    let backend = snapshot::platform_backend(config);
    let module = SnapshotModule::with_runtime(backend, config.worker_threads)?;

    tracing::info!(
        "Snapshot module v{} ready: {:?}",
        env!("CARGO_PKG_VERSION"),
        module.descriptor()
    );
    Ok(module)
}

fn module() -> Result<&'static SnapshotModule<PlatformBackend>, ModuleError> {
    if let Some(module) = MODULE.get() {
        return Ok(module);
    }

    // Losing a race here just drops the extra module.
    let _ = MODULE.set(build_module(&SnapshotConfig::from_env())?);
    MODULE.get().ok_or(ModuleError::AlreadyInitialized)
}

/// Take a snapshot
///
/// Returns immediately. `on_complete` runs exactly once on a snapshot
/// worker thread.
pub fn snapshot<F>(options: SnapshotOptions, on_complete: F)
where
    F: FnOnce(SnapshotResult) + Send + 'static,
{
    match module() {
        Ok(module) => module.snapshot(options, on_complete),
        Err(e) => {
            tracing::error!("Snapshot module unavailable: {}", e);
            let result = SnapshotResult::failure(SnapshotError::NativeFailure(format!(
                "snapshot module unavailable: {}",
                e
            )));
            Completion::new(on_complete).complete_detached(result);
        }
    }
}

/// Take a snapshot and await the result
pub async fn snapshot_async(options: SnapshotOptions) -> SnapshotResult {
    let (tx, rx) = tokio::sync::oneshot::channel();
    snapshot(options, move |result| {
        let _ = tx.send(result);
    });

    rx.await.unwrap_or_else(|_| {
        SnapshotResult::failure(SnapshotError::NativeFailure(
            "snapshot completion was lost".to_string(),
        ))
    })
}

/// Capability record compiled into this build
pub fn active_capability() -> CapabilityDescriptor {
    snapshot::ACTIVE_CAPABILITY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_global_snapshot_completes_and_keeps_capability() {
        init_logging();
        let before = active_capability();

        // No `source`: implemented targets fail inside the binding, stub
        // targets fail as unimplemented. Either way, exactly one completion.
        for _ in 0..2 {
            let result = snapshot_async(SnapshotOptions::new().with("quality", 0.8)).await;
            let reason = result.reason().cloned();

            if before.is_implemented() {
                assert!(matches!(reason, Some(SnapshotError::NativeFailure(_))));
            } else {
                assert_eq!(reason, Some(SnapshotError::Unimplemented));
            }
        }

        assert_eq!(active_capability(), before);
        assert_eq!(module().unwrap().descriptor(), before);
    }

    #[tokio::test]
    async fn test_init_after_first_use_is_rejected() {
        let _ = snapshot_async(SnapshotOptions::new()).await;
        assert!(matches!(
            init(SnapshotConfig::default()),
            Err(ModuleError::AlreadyInitialized)
        ));
    }
}
