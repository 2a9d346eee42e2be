//! Stub for platforms without native snapshot support
//!
//! Every call completes with `Failure(Unimplemented)` instead of silently
//! doing nothing.

use super::result::SnapshotResult;
use super::traits::{CapabilityDescriptor, SnapshotBackend, SnapshotOptions};
use crate::utils::error::SnapshotError;
use async_trait::async_trait;

pub struct UnimplementedBackend {
    descriptor: CapabilityDescriptor,
}

impl UnimplementedBackend {
    pub fn new() -> Self {
        Self {
            descriptor: CapabilityDescriptor::unimplemented(std::env::consts::OS),
        }
    }
}

impl Default for UnimplementedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotBackend for UnimplementedBackend {
    fn descriptor(&self) -> CapabilityDescriptor {
        self.descriptor
    }

    async fn capture(&self, _options: SnapshotOptions) -> SnapshotResult {
        tracing::warn!("Snapshot is not yet implemented for {}", self.descriptor.platform);
        SnapshotResult::failure(SnapshotError::Unimplemented)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_always_fails_unimplemented() {
        let backend = UnimplementedBackend::new();
        let options = SnapshotOptions::new().with("quality", 0.8);

        for _ in 0..3 {
            let result = backend.capture(options.clone()).await;
            assert_eq!(result, SnapshotResult::failure(SnapshotError::Unimplemented));
        }
        assert!(!backend.descriptor().is_implemented());
    }
}
