//! Thumbnail frame extraction.

use std::path::Path;
use tracing::debug;

use laddr_models::{ThumbnailMode, ThumbnailOptions};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Default extraction timestamp for sources of normal length.
const DEFAULT_TIMESTAMP: &str = "00:00:05";
/// Extraction timestamp when the source is shorter than the default seek.
const FALLBACK_TIMESTAMP: &str = "00:00:01";
/// Below this duration the default seek would land past the end.
const MIN_DURATION_FOR_DEFAULT: f64 = 5.0;
/// JPEG quality (2-31, lower is better).
const JPEG_QUALITY: u32 = 2;
/// Bounding box the frame is scaled into, aspect ratio preserved.
const SCALE_FILTER: &str = "scale=1280:720:force_original_aspect_ratio=decrease";

/// How the thumbnail frame will actually be picked.
#[derive(Debug, Clone, PartialEq)]
pub enum ThumbnailPlan {
    /// Seek to a timestamp and grab one frame
    AtTimestamp(String),
    /// Let the thumbnail filter scan 100 frames for the most representative one
    SceneScan,
}

impl ThumbnailPlan {
    /// Label recorded alongside the thumbnail in the final result.
    pub fn label(&self) -> String {
        match self {
            ThumbnailPlan::AtTimestamp(ts) => ts.clone(),
            ThumbnailPlan::SceneScan => "scene_based".to_string(),
        }
    }
}

/// Decide the extraction plan for the given options and source duration.
///
/// Custom timestamps past the end of the asset are clamped to one second
/// before the end rather than rejected.
pub fn resolve_plan(options: &ThumbnailOptions, duration: f64) -> MediaResult<ThumbnailPlan> {
    match options.mode {
        ThumbnailMode::None => Err(MediaError::InvalidVideo(
            "thumbnail mode is none".to_string(),
        )),
        ThumbnailMode::SceneBased => Ok(ThumbnailPlan::SceneScan),
        ThumbnailMode::Custom => {
            let requested = options
                .custom_timestamp
                .as_deref()
                .ok_or_else(|| MediaError::InvalidTimestamp("custom mode without timestamp".to_string()))?;
            let seconds = parse_timestamp(requested)?;
            if seconds >= duration {
                let clamped = format_timestamp((duration - 1.0).max(0.0));
                debug!(requested, clamped = %clamped, "custom timestamp past end, clamped");
                Ok(ThumbnailPlan::AtTimestamp(clamped))
            } else {
                Ok(ThumbnailPlan::AtTimestamp(requested.to_string()))
            }
        }
        ThumbnailMode::Auto => {
            if duration < MIN_DURATION_FOR_DEFAULT {
                Ok(ThumbnailPlan::AtTimestamp(FALLBACK_TIMESTAMP.to_string()))
            } else {
                Ok(ThumbnailPlan::AtTimestamp(DEFAULT_TIMESTAMP.to_string()))
            }
        }
    }
}

/// Extract a thumbnail frame to `output` following the given plan.
pub async fn extract_thumbnail(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    plan: &ThumbnailPlan,
    timeout_secs: u64,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }

    let cmd = match plan {
        ThumbnailPlan::AtTimestamp(ts) => FfmpegCommand::new(input, output)
            .seek(ts.clone())
            .video_filter(SCALE_FILTER)
            .single_frame()
            .output_args(["-q:v", &JPEG_QUALITY.to_string()]),
        ThumbnailPlan::SceneScan => FfmpegCommand::new(input, output)
            .video_filter(format!("thumbnail=n=100,{SCALE_FILTER}"))
            .single_frame()
            .output_args(["-q:v", &JPEG_QUALITY.to_string()]),
    };

    FfmpegRunner::new().with_timeout(timeout_secs).run(&cmd).await?;

    let metadata = tokio::fs::metadata(output).await?;
    if metadata.len() == 0 {
        return Err(MediaError::InvalidVideo("thumbnail file is empty".to_string()));
    }
    Ok(())
}

/// Parse "HH:MM:SS", "MM:SS", or plain seconds into seconds.
pub fn parse_timestamp(timestamp: &str) -> MediaResult<f64> {
    fn part(s: &str, original: &str) -> MediaResult<f64> {
        s.parse::<f64>()
            .ok()
            .filter(|v| *v >= 0.0)
            .ok_or_else(|| MediaError::InvalidTimestamp(original.to_string()))
    }

    let parts: Vec<&str> = timestamp.split(':').collect();
    match parts.as_slice() {
        [h, m, s] => Ok(part(h, timestamp)? * 3600.0 + part(m, timestamp)? * 60.0 + part(s, timestamp)?),
        [m, s] => Ok(part(m, timestamp)? * 60.0 + part(s, timestamp)?),
        [s] => part(s, timestamp),
        _ => Err(MediaError::InvalidTimestamp(timestamp.to_string())),
    }
}

/// Format seconds as "HH:MM:SS.ss".
pub fn format_timestamp(seconds: f64) -> String {
    let h = (seconds / 3600.0) as u64;
    let m = ((seconds % 3600.0) / 60.0) as u64;
    let s = seconds % 60.0;
    format!("{h:02}:{m:02}:{s:05.2}")
}
