//! Platform-specific snapshot implementations
//!
//! Exactly one backend is compiled in per target:
//! - macOS, Linux, Windows: native capture through FFmpeg
//! - iOS: native capture through AVFoundation
//! - Android: stub that fails with `Unimplemented`
//!
//! Any other target fails to build.

pub mod native;
pub mod result;
pub mod traits;
pub mod unimplemented;

#[cfg(any(
    target_os = "macos",
    target_os = "linux",
    target_os = "windows",
    target_os = "ios"
))]
pub mod request;

#[cfg(any(target_os = "macos", target_os = "linux", target_os = "windows"))]
pub mod ffmpeg;

#[cfg(target_os = "ios")]
pub mod ios;

use crate::dispatcher::config::SnapshotConfig;

pub use result::{SnapshotPayload, SnapshotResult};
pub use traits::{Capability, CapabilityDescriptor, NativeBinding, SnapshotBackend, SnapshotOptions};

#[cfg(not(any(
    target_os = "macos",
    target_os = "linux",
    target_os = "windows",
    target_os = "ios",
    target_os = "android"
)))]
compile_error!("video-snapshot has no snapshot implementation for this target");

#[cfg(any(target_os = "macos", target_os = "linux", target_os = "windows"))]
pub type PlatformBackend = native::NativeBackend<ffmpeg::FfmpegFrameGrabber>;

#[cfg(target_os = "ios")]
pub type PlatformBackend = native::NativeBackend<ios::AvFoundationFrameGrabber>;

#[cfg(target_os = "android")]
pub type PlatformBackend = unimplemented::UnimplementedBackend;

/// Capability record of the backend compiled into this build
#[cfg(not(target_os = "android"))]
pub const ACTIVE_CAPABILITY: CapabilityDescriptor =
    CapabilityDescriptor::implemented(std::env::consts::OS);

/// Capability record of the backend compiled into this build
#[cfg(target_os = "android")]
pub const ACTIVE_CAPABILITY: CapabilityDescriptor =
    CapabilityDescriptor::unimplemented(std::env::consts::OS);

/// Build the backend for the current target
pub fn platform_backend(config: &SnapshotConfig) -> PlatformBackend {
    #[cfg(any(target_os = "macos", target_os = "linux", target_os = "windows"))]
    {
        let grabber = ffmpeg::FfmpegFrameGrabber::new(
            config.ffmpeg_path.clone(),
            config.resolved_output_dir(),
        );
        native::NativeBackend::new(grabber).with_timeout(config.timeout())
    }

    #[cfg(target_os = "ios")]
    {
        let grabber = ios::AvFoundationFrameGrabber::new(config.output_dir.clone());
        native::NativeBackend::new(grabber).with_timeout(config.timeout())
    }

    #[cfg(target_os = "android")]
    {
        let _ = config;
        unimplemented::UnimplementedBackend::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_backend_matches_active_capability() {
        let backend = platform_backend(&SnapshotConfig::default());
        assert_eq!(backend.descriptor(), ACTIVE_CAPABILITY);
    }

    #[test]
    fn test_active_capability_matches_target() {
        assert_eq!(ACTIVE_CAPABILITY.platform, std::env::consts::OS);

        #[cfg(not(target_os = "android"))]
        assert!(ACTIVE_CAPABILITY.is_implemented());

        #[cfg(target_os = "android")]
        assert!(!ACTIVE_CAPABILITY.is_implemented());
    }
}
