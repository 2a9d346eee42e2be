//! Snapshot module
//!
//! Owns one snapshot backend and the executor its captures run on, and
//! implements the public `snapshot(options, on_complete)` operation.
//!
//! Completion handlers run on a worker thread of the module's tokio
//! runtime, never on the caller's stack. Callers that own a UI thread must
//! marshal back to it themselves.

use super::completion::{Completion, ABANDONED_DETAIL};
use crate::snapshot::result::SnapshotResult;
use crate::snapshot::traits::{CapabilityDescriptor, SnapshotBackend, SnapshotOptions};
use crate::utils::error::{ModuleResult, SnapshotError};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::oneshot;

pub struct SnapshotModule<B> {
    backend: Arc<B>,
    handle: Handle,
    runtime: Option<Runtime>,
}

impl<B: SnapshotBackend> SnapshotModule<B> {
    /// Run captures on an existing runtime
    pub fn with_handle(backend: B, handle: Handle) -> Self {
        Self {
            backend: Arc::new(backend),
            handle,
            runtime: None,
        }
    }

    /// Run captures on a dedicated multi-thread runtime
    pub fn with_runtime(backend: B, worker_threads: usize) -> ModuleResult<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("video-snapshot")
            .enable_all()
            .build()?;

        Ok(Self {
            backend: Arc::new(backend),
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
        })
    }

    /// Capability record of the backend this module dispatches to
    pub fn descriptor(&self) -> CapabilityDescriptor {
        self.backend.descriptor()
    }

    /// Take a snapshot
    ///
    /// Returns immediately. `on_complete` is called exactly once, later, with
    /// either a `Success` or a `Failure`.
    pub fn snapshot<F>(&self, options: SnapshotOptions, on_complete: F)
    where
        F: FnOnce(SnapshotResult) + Send + 'static,
    {
        // The task takes the completion out of the slot. If the runtime is
        // shut down, `spawn` drops the task on this thread instead, and the
        // completion is still in the slot afterwards.
        let slot = Arc::new(Mutex::new(Some(Completion::new(on_complete))));
        let task_slot = Arc::clone(&slot);
        let backend = Arc::clone(&self.backend);
        let handle = self.handle.clone();

        tracing::debug!("Dispatching snapshot to {:?}", backend.descriptor());

        self.handle.spawn(async move {
            let capture = handle.spawn(async move { backend.capture(options).await });

            let result = match capture.await {
                Ok(result) => result,
                Err(e) if e.is_panic() => {
                    tracing::error!("Snapshot task panicked: {}", e);
                    SnapshotResult::failure(SnapshotError::NativeFailure(format!(
                        "snapshot task panicked: {}",
                        e
                    )))
                }
                Err(e) => {
                    tracing::warn!("Snapshot task cancelled: {}", e);
                    SnapshotResult::failure(SnapshotError::NativeFailure(ABANDONED_DETAIL.to_string()))
                }
            };

            let completion = task_slot.lock().take();
            if let Some(completion) = completion {
                completion.complete(result);
            }
        });

        if Arc::strong_count(&slot) == 1 {
            let completion = slot.lock().take();
            if let Some(completion) = completion {
                tracing::warn!("Snapshot runtime is shut down; failing snapshot");
                completion.complete_detached(SnapshotResult::failure(SnapshotError::NativeFailure(
                    ABANDONED_DETAIL.to_string(),
                )));
            }
        }
    }

    /// Take a snapshot and await the result
    pub async fn snapshot_async(&self, options: SnapshotOptions) -> SnapshotResult {
        let (tx, rx) = oneshot::channel();
        self.snapshot(options, move |result| {
            let _ = tx.send(result);
        });

        rx.await.unwrap_or_else(|_| {
            SnapshotResult::failure(SnapshotError::NativeFailure(ABANDONED_DETAIL.to_string()))
        })
    }
}

impl<B> Drop for SnapshotModule<B> {
    fn drop(&mut self) {
        // Safe to drop from inside another runtime; pending completions
        // fire their abandoned failure as their tasks are dropped.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
