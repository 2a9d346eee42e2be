//! Frame request parsing shared by the native bindings
//!
//! Both native bindings read the same option keys: `source`, `time`,
//! `width`, `height`, `quality`, `format`, `timestamp`, `timestampPrefix`,
//! `textSize` and `outputDir`.

use super::traits::SnapshotOptions;
use anyhow::{anyhow, bail, Context};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const DEFAULT_QUALITY: f64 = 0.9;
const DEFAULT_TEXT_SIZE: u64 = 24;

/// Output image format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Jpg,
    Png,
}

impl SnapshotFormat {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(SnapshotFormat::Jpg),
            "png" => Ok(SnapshotFormat::Png),
            other => bail!("unsupported format `{}` (expected jpg or png)", other),
        }
    }

    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            SnapshotFormat::Jpg => "jpg",
            SnapshotFormat::Png => "png",
        }
    }
}

/// Text label drawn over the frame
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampLabel {
    pub prefix: String,
    pub text_size: u64,
}

/// A frame grab, parsed from snapshot options
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRequest {
    pub source: PathBuf,
    pub time_secs: f64,
    pub width: Option<u64>,
    pub height: Option<u64>,
    pub quality: f64,
    pub format: SnapshotFormat,
    pub timestamp: Option<TimestampLabel>,
    pub output_dir: Option<PathBuf>,
}

impl FrameRequest {
    pub fn from_options(options: &SnapshotOptions) -> anyhow::Result<Self> {
        let source = options
            .get_str("source")
            .ok_or_else(|| anyhow!("missing `source` option"))
            .and_then(source_path)?;

        let time_secs = options.get_f64("time").unwrap_or(0.0);
        if !time_secs.is_finite() || time_secs < 0.0 {
            bail!("`time` must be a non-negative number of seconds, got {}", time_secs);
        }

        let quality = options.get_f64("quality").unwrap_or(DEFAULT_QUALITY);
        if !(0.0..=1.0).contains(&quality) {
            bail!("`quality` must be between 0 and 1, got {}", quality);
        }

        let format = match options.get_str("format") {
            Some(raw) => SnapshotFormat::parse(raw)?,
            None => SnapshotFormat::Jpg,
        };

        let timestamp = options.get_bool("timestamp").unwrap_or(false).then(|| TimestampLabel {
            prefix: options.get_str("timestampPrefix").unwrap_or_default().to_string(),
            text_size: options.get_u64("textSize").unwrap_or(DEFAULT_TEXT_SIZE),
        });

        Ok(Self {
            source,
            time_secs,
            width: options.get_u64("width").filter(|&w| w > 0),
            height: options.get_u64("height").filter(|&h| h > 0),
            quality,
            format,
            timestamp,
            output_dir: options.get_str("outputDir").map(PathBuf::from),
        })
    }

    /// Label text for the frame, if a timestamp was requested
    pub fn label_text(&self) -> Option<String> {
        self.timestamp
            .as_ref()
            .map(|label| format!("{}{}", label.prefix, format_timestamp(self.time_secs)))
    }

    /// Where this request's image will be written
    pub fn output_path(&self, default_dir: &Path) -> PathBuf {
        let dir = self.output_dir.as_deref().unwrap_or(default_dir);
        dir.join(format!("snapshot-{}.{}", Uuid::new_v4(), self.format.extension()))
    }
}

/// Remove an image nobody will receive a handle to
pub(crate) async fn discard_output(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!("Discarded abandoned snapshot {:?}", path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to discard abandoned snapshot {:?}: {}", path, e),
    }
}

/// Accept plain paths and `file://` URIs
fn source_path(raw: &str) -> anyhow::Result<PathBuf> {
    match raw.strip_prefix("file://") {
        Some(rest) => {
            let decoded = urlencoding::decode(rest).context("`source` is not a valid file URI")?;
            Ok(PathBuf::from(decoded.into_owned()))
        }
        None if raw.is_empty() => bail!("`source` is empty"),
        None => Ok(PathBuf::from(raw)),
    }
}

/// `file://` URI for a local path, percent-encoding each segment
pub fn file_uri(path: &Path) -> String {
    let normalized = path.to_string_lossy().replace('\\', "/");
    let encoded: Vec<String> = normalized
        .split('/')
        .enumerate()
        .map(|(i, segment)| {
            // Keep Windows drive letters ("C:") readable.
            if i == 0 && segment.len() == 2 && segment.ends_with(':') {
                segment.to_string()
            } else {
                urlencoding::encode(segment).into_owned()
            }
        })
        .collect();

    let joined = encoded.join("/");
    if joined.starts_with('/') {
        format!("file://{}", joined)
    } else {
        format!("file:///{}", joined)
    }
}

/// HH:MM:SS.mmm
fn format_timestamp(secs: f64) -> String {
    let total_ms = (secs * 1000.0).round() as u64;
    let (h, rem) = (total_ms / 3_600_000, total_ms % 3_600_000);
    let (m, rem) = (rem / 60_000, rem % 60_000);
    format!("{:02}:{:02}:{:02}.{:03}", h, m, rem / 1000, rem % 1000)
}
