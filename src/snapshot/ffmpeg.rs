//! FFmpeg-based frame grabber for desktop targets
//!
//! Pulls a single frame out of a video file with the `ffmpeg` CLI and
//! writes it as a JPEG or PNG. Optionally burns the frame time into the
//! image as a text label.

use super::native::NativeCompletion;
use super::request::{discard_output, file_uri, FrameRequest, SnapshotFormat};
use super::traits::{NativeBinding, SnapshotOptions};
use anyhow::{bail, Context};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

impl FrameRequest {
    /// FFmpeg `-q:v` value for JPEG output (2 = best, 31 = worst)
    pub fn jpeg_qscale(&self) -> u8 {
        (31.0 - (self.quality * 29.0).round()) as u8
    }

    /// Video filter chain, if any filter is needed
    pub fn video_filter(&self) -> Option<String> {
        let mut filters = Vec::new();

        match (self.width, self.height) {
            (None, None) => {}
            (w, h) => filters.push(format!(
                "scale={}:{}",
                w.map_or("-2".to_string(), |w| w.to_string()),
                h.map_or("-2".to_string(), |h| h.to_string())
            )),
        }

        if let (Some(label), Some(text)) = (&self.timestamp, self.label_text()) {
            filters.push(format!(
                "drawtext=text='{}':fontsize={}:expansion=none:fontcolor=white:box=1:boxcolor=black@0.5:x=10:y=h-th-10",
                escape_drawtext(&text),
                label.text_size
            ));
        }

        if filters.is_empty() {
            None
        } else {
            Some(filters.join(","))
        }
    }

    /// Full FFmpeg argument list writing to `output`
    pub fn ffmpeg_args(&self, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-y".into(),
            "-ss".into(),
            format!("{:.3}", self.time_secs),
            "-i".into(),
            self.source.to_string_lossy().into_owned(),
            "-frames:v".into(),
            "1".into(),
        ];

        if let Some(filter) = self.video_filter() {
            args.push("-vf".into());
            args.push(filter);
        }

        if self.format == SnapshotFormat::Jpg {
            args.push("-q:v".into());
            args.push(self.jpeg_qscale().to_string());
        }

        // Single-file write: stops the image2 muxer treating `%` in the
        // path as a sequence pattern.
        args.push("-update".into());
        args.push("1".into());

        args.push(output.to_string_lossy().into_owned());
        args
    }
}

/// Native binding that grabs frames with the `ffmpeg` CLI
pub struct FfmpegFrameGrabber {
    ffmpeg_path: String,
    output_dir: PathBuf,
}

impl FfmpegFrameGrabber {
    pub fn new(ffmpeg_path: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Where a request's image will be written
    pub fn output_path(&self, request: &FrameRequest) -> PathBuf {
        request.output_path(&self.output_dir)
    }

    async fn grab(ffmpeg_path: &str, request: &FrameRequest, output: &Path) -> anyhow::Result<()> {
        if let Some(dir) = output.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("failed to create output directory {:?}", dir))?;
        }

        tracing::debug!("Grabbing frame at {:.3}s from {:?}", request.time_secs, request.source);

        let result = Command::new(ffmpeg_path)
            .args(request.ffmpeg_args(output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to start {}", ffmpeg_path))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let last_line = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
            bail!("ffmpeg exited with {}: {}", result.status, last_line.trim());
        }

        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            bail!("ffmpeg produced no image at {:?}", output);
        }

        Ok(())
    }
}

impl NativeBinding for FfmpegFrameGrabber {
    fn capture(&self, options: SnapshotOptions, completion: NativeCompletion) {
        let request = match FrameRequest::from_options(&options) {
            Ok(request) => request,
            Err(e) => {
                completion.fail(format!("{:#}", e));
                return;
            }
        };

        let output = self.output_path(&request);
        let ffmpeg_path = self.ffmpeg_path.clone();

        tokio::spawn(async move {
            let mut completion = completion;

            // Dropping the grab kills ffmpeg.
            let outcome = tokio::select! {
                outcome = Self::grab(&ffmpeg_path, &request, &output) => Some(outcome),
                _ = completion.closed() => None,
            };

            match outcome {
                Some(Ok(())) if !completion.is_closed() => {
                    tracing::info!("Snapshot written to {:?}", output);
                    completion.succeed(file_uri(&output));
                }
                Some(Err(e)) => completion.fail(format!("{:#}", e)),
                Some(Ok(())) | None => {
                    tracing::warn!("Snapshot abandoned by caller; discarding {:?}", output);
                    discard_output(&output).await;
                }
            }
        });
    }
}

/// Escape text for a quoted drawtext value inside a filtergraph
fn escape_drawtext(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("'\\''"),
            ':' => out.push_str("\\:"),
            _ => out.push(c),
        }
    }
    out
}
