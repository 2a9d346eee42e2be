//! Snapshot module configuration

use crate::utils::error::ModuleResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the process-wide snapshot module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotConfig {
    /// Worker threads of the snapshot runtime
    pub worker_threads: usize,

    /// Give up on the native binding after this many milliseconds
    pub timeout_ms: Option<u64>,

    /// FFmpeg executable used by the desktop binding
    pub ffmpeg_path: String,

    /// Default directory for captured images
    pub output_dir: Option<PathBuf>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            timeout_ms: None,
            ffmpeg_path: "ffmpeg".to_string(),
            output_dir: None,
        }
    }
}

impl SnapshotConfig {
    /// Parse a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> ModuleResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read overrides from `VIDEO_SNAPSHOT_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup("VIDEO_SNAPSHOT_TIMEOUT_MS") {
            match raw.parse() {
                Ok(ms) => config.timeout_ms = Some(ms),
                Err(_) => tracing::warn!("Ignoring invalid VIDEO_SNAPSHOT_TIMEOUT_MS: {}", raw),
            }
        }

        if let Some(raw) = lookup("VIDEO_SNAPSHOT_WORKER_THREADS") {
            match raw.parse::<usize>() {
                Ok(n) if n > 0 => config.worker_threads = n,
                _ => tracing::warn!("Ignoring invalid VIDEO_SNAPSHOT_WORKER_THREADS: {}", raw),
            }
        }

        if let Some(path) = lookup("VIDEO_SNAPSHOT_FFMPEG").filter(|p| !p.is_empty()) {
            config.ffmpeg_path = path;
        }

        if let Some(dir) = lookup("VIDEO_SNAPSHOT_OUTPUT_DIR").filter(|d| !d.is_empty()) {
            config.output_dir = Some(PathBuf::from(dir));
        }

        config
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Output directory, falling back to a folder in the system temp dir
    pub fn resolved_output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("video-snapshot"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_from_json_fills_defaults() {
        let config = SnapshotConfig::from_json(r#"{ "timeoutMs": 5000 }"#).unwrap();
        assert_eq!(config.timeout(), Some(Duration::from_millis(5000)));
        assert_eq!(config.ffmpeg_path, "ffmpeg");
        assert_eq!(config.worker_threads, 2);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(SnapshotConfig::from_json("{ not json").is_err());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let env: HashMap<&str, &str> = [
            ("VIDEO_SNAPSHOT_TIMEOUT_MS", "250"),
            ("VIDEO_SNAPSHOT_WORKER_THREADS", "0"),
            ("VIDEO_SNAPSHOT_FFMPEG", "/opt/ffmpeg/bin/ffmpeg"),
            ("VIDEO_SNAPSHOT_OUTPUT_DIR", "/var/snapshots"),
        ]
        .into_iter()
        .collect();

        let config = SnapshotConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.timeout_ms, Some(250));
        // Zero threads is rejected and the default kept.
        assert_eq!(config.worker_threads, 2);
        assert_eq!(config.ffmpeg_path, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(config.resolved_output_dir(), PathBuf::from("/var/snapshots"));
    }

    #[test]
    fn test_default_output_dir_is_in_temp() {
        let config = SnapshotConfig::default();
        assert!(config.resolved_output_dir().starts_with(std::env::temp_dir()));
    }
}
