//! Native-backed snapshot implementation
//!
//! Adapts a [`NativeBinding`] to the [`SnapshotBackend`] contract and turns
//! whatever the binding reports into a [`SnapshotResult`].

use super::result::SnapshotResult;
use super::traits::{CapabilityDescriptor, NativeBinding, SnapshotBackend, SnapshotOptions};
use crate::utils::error::SnapshotError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::oneshot;

const DROPPED_DETAIL: &str = "native binding dropped its completion without reporting a result";
const EMPTY_PAYLOAD_DETAIL: &str = "native binding returned an empty payload";

/// Single-shot completion handed to a native binding
///
/// `succeed` and `fail` consume it, so a binding cannot report twice.
/// Dropping it without reporting counts as a failure.
pub struct NativeCompletion {
    tx: Option<oneshot::Sender<Result<String, String>>>,
}

impl NativeCompletion {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<Result<String, String>>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Report a captured image
    pub fn succeed(self, payload: impl Into<String>) {
        self.report(Ok(payload.into()));
    }

    /// Report a failure with an opaque diagnostic
    pub fn fail(self, detail: impl Into<String>) {
        self.report(Err(detail.into()));
    }

    /// Report either outcome
    pub fn report(mut self, outcome: Result<String, String>) {
        self.send(outcome);
    }

    /// Whether the caller stopped waiting (timeout or dropped request)
    pub fn is_closed(&self) -> bool {
        self.tx.as_ref().map_or(true, |tx| tx.is_closed())
    }

    /// Resolves once the caller stops waiting
    ///
    /// Bindings race their work against this to stop early after a timeout.
    pub async fn closed(&mut self) {
        if let Some(tx) = self.tx.as_mut() {
            tx.closed().await;
        }
    }

    fn send(&mut self, outcome: Result<String, String>) {
        if let Some(tx) = self.tx.take() {
            // The receiver is gone once a timeout fired; nothing to deliver to.
            let _ = tx.send(outcome);
        }
    }
}

impl Drop for NativeCompletion {
    fn drop(&mut self) {
        self.send(Err(DROPPED_DETAIL.to_string()));
    }
}

/// Snapshot backend that delegates capture to a native binding
pub struct NativeBackend<B> {
    binding: B,
    descriptor: CapabilityDescriptor,
    timeout: Option<Duration>,
}

impl<B: NativeBinding> NativeBackend<B> {
    /// Wrap a binding for the current target
    pub fn new(binding: B) -> Self {
        Self {
            binding,
            descriptor: CapabilityDescriptor::implemented(std::env::consts::OS),
            timeout: None,
        }
    }

    /// Give up on the binding after `timeout`. `None` waits forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binding(&self) -> &B {
        &self.binding
    }
}

#[async_trait]
impl<B: NativeBinding> SnapshotBackend for NativeBackend<B> {
    fn descriptor(&self) -> CapabilityDescriptor {
        self.descriptor
    }

    async fn capture(&self, options: SnapshotOptions) -> SnapshotResult {
        let (completion, rx) = NativeCompletion::channel();
        self.binding.capture(options, completion);

        let outcome = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, rx).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    let ms = timeout.as_millis();
                    tracing::warn!("Native snapshot timed out after {} ms", ms);
                    return SnapshotResult::failure(SnapshotError::NativeFailure(format!(
                        "snapshot timed out after {} ms",
                        ms
                    )));
                }
            },
            None => rx.await,
        };

        match outcome {
            Ok(Ok(payload)) if payload.is_empty() => {
                tracing::warn!("{}", EMPTY_PAYLOAD_DETAIL);
                SnapshotResult::failure(SnapshotError::NativeFailure(EMPTY_PAYLOAD_DETAIL.to_string()))
            }
            Ok(Ok(payload)) => {
                tracing::debug!("Native snapshot captured: {}", payload);
                SnapshotResult::success(payload)
            }
            Ok(Err(detail)) => {
                tracing::warn!("Native snapshot failed: {}", detail);
                SnapshotResult::failure(SnapshotError::NativeFailure(detail))
            }
            // The completion's Drop always sends, so this only happens if the
            // sender was leaked.
            Err(_) => SnapshotResult::failure(SnapshotError::NativeFailure(DROPPED_DETAIL.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reports a fixed outcome from a spawned task
    struct FixedBinding(Result<&'static str, &'static str>);

    impl NativeBinding for FixedBinding {
        fn capture(&self, _options: SnapshotOptions, completion: NativeCompletion) {
            let outcome = self.0.map(str::to_string).map_err(str::to_string);
            tokio::spawn(async move { completion.report(outcome) });
        }
    }

    /// Forgets to call its completion
    struct SilentBinding;

    impl NativeBinding for SilentBinding {
        fn capture(&self, _options: SnapshotOptions, completion: NativeCompletion) {
            drop(completion);
        }
    }

    /// Never reports and never drops until the test ends
    struct HangingBinding(parking_lot::Mutex<Vec<NativeCompletion>>);

    impl NativeBinding for HangingBinding {
        fn capture(&self, _options: SnapshotOptions, completion: NativeCompletion) {
            self.0.lock().push(completion);
        }
    }

    #[tokio::test]
    async fn test_success_is_passed_through() {
        let backend = NativeBackend::new(FixedBinding(Ok("img://123")));
        let result = backend.capture(SnapshotOptions::new()).await;
        assert_eq!(result, SnapshotResult::success("img://123"));
    }

    #[tokio::test]
    async fn test_failure_detail_is_verbatim() {
        let backend = NativeBackend::new(FixedBinding(Err("Cannot Open (-11829)")));
        let result = backend.capture(SnapshotOptions::new()).await;
        assert_eq!(
            result.reason(),
            Some(&SnapshotError::NativeFailure("Cannot Open (-11829)".to_string()))
        );
    }

    #[tokio::test]
    async fn test_empty_payload_is_a_failure() {
        let backend = NativeBackend::new(FixedBinding(Ok("")));
        let result = backend.capture(SnapshotOptions::new()).await;
        assert_eq!(
            result.reason(),
            Some(&SnapshotError::NativeFailure(EMPTY_PAYLOAD_DETAIL.to_string()))
        );
    }

    #[tokio::test]
    async fn test_dropped_completion_is_a_failure() {
        let backend = NativeBackend::new(SilentBinding);
        let result = backend.capture(SnapshotOptions::new()).await;
        assert_eq!(
            result.reason(),
            Some(&SnapshotError::NativeFailure(DROPPED_DETAIL.to_string()))
        );
    }

    #[tokio::test]
    async fn test_timeout_fails_and_late_report_is_ignored() {
        let backend = NativeBackend::new(HangingBinding(parking_lot::Mutex::new(Vec::new())))
            .with_timeout(Some(Duration::from_millis(20)));

        let result = backend.capture(SnapshotOptions::new()).await;
        assert_eq!(
            result.reason(),
            Some(&SnapshotError::NativeFailure("snapshot timed out after 20 ms".to_string()))
        );

        // Reporting after the timeout must not panic.
        let pending: Vec<_> = backend.binding().0.lock().drain(..).collect();
        for completion in pending {
            completion.succeed("img://late");
        }
    }

    #[tokio::test]
    async fn test_completion_sees_receiver_going_away() {
        let (mut completion, rx) = NativeCompletion::channel();
        assert!(!completion.is_closed());

        drop(rx);
        completion.closed().await;
        assert!(completion.is_closed());
    }

    #[test]
    fn test_descriptor_is_implemented_for_current_os() {
        let backend = NativeBackend::new(SilentBinding);
        let descriptor = backend.descriptor();
        assert!(descriptor.is_implemented());
        assert_eq!(descriptor.platform, std::env::consts::OS);
    }
}
