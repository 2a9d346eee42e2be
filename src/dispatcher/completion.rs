//! Single-shot completion handler
//!
//! Wraps the caller's callback so it runs exactly once: `complete` consumes
//! the handle, and dropping an uncompleted handle reports a failure.

use crate::snapshot::result::SnapshotResult;
use crate::utils::error::SnapshotError;

pub(crate) const ABANDONED_DETAIL: &str = "snapshot was abandoned before completing";

type Handler = Box<dyn FnOnce(SnapshotResult) + Send + 'static>;

pub struct Completion {
    handler: Option<Handler>,
}

impl Completion {
    pub fn new<F>(handler: F) -> Self
    where
        F: FnOnce(SnapshotResult) + Send + 'static,
    {
        Self {
            handler: Some(Box::new(handler)),
        }
    }

    /// Deliver the result to the caller
    pub fn complete(mut self, result: SnapshotResult) {
        if let Some(handler) = self.handler.take() {
            handler(result);
        }
    }

    /// Deliver the result from a fresh thread
    ///
    /// For outcomes known before any executor accepted the work, so the
    /// handler still never runs on the caller's stack.
    pub fn complete_detached(self, result: SnapshotResult) {
        std::thread::spawn(move || self.complete(result));
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            tracing::warn!("Snapshot completion dropped without a result");
            handler(SnapshotResult::failure(SnapshotError::NativeFailure(
                ABANDONED_DETAIL.to_string(),
            )));
        }
    }
}
