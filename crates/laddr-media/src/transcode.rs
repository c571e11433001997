//! Single-chunk transcode to an HLS-compatible MPEG-TS segment.

use std::path::Path;
use tracing::debug;

use laddr_models::{QualityPreset, Resolution, WatermarkOptions};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::watermark::build_watermark_filter;

/// Build the video filter chain: scale to target height, then the optional
/// watermark overlay. Width -2 keeps the aspect ratio and even dimensions.
pub fn build_filter_chain(resolution: Resolution, watermark: Option<&WatermarkOptions>) -> String {
    let mut filters = vec![format!("scale=-2:{}", resolution.height())];
    if let Some(wm) = watermark {
        if !wm.text.trim().is_empty() {
            filters.push(build_watermark_filter(wm));
        }
    }
    filters.join(",")
}

/// Transcode one chunk file to the target resolution.
///
/// Output is MPEG-TS so segments can be referenced directly from an HLS
/// variant playlist. The mux flags normalize timestamps: each chunk was
/// split with reset timestamps, and players are told to expect the
/// discontinuity, but the segment itself must start at zero with
/// monotonic PTS.
pub async fn transcode_chunk_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    resolution: Resolution,
    watermark: Option<&WatermarkOptions>,
    quality_preset: QualityPreset,
    timeout_secs: u64,
) -> MediaResult<()> {
    let input = input.as_ref();
    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }

    let filter = build_filter_chain(resolution, watermark);
    debug!(resolution = %resolution, filter = %filter, "transcoding chunk");

    let cmd = FfmpegCommand::new(input, output.as_ref())
        .video_filter(filter)
        .video_codec("libx264")
        .preset(quality_preset.as_str())
        .crf(23)
        .audio_codec("aac")
        .audio_bitrate("128k")
        .output_args(["-f", "mpegts"])
        .output_args(["-muxdelay", "0"])
        .output_args(["-muxpreload", "0"])
        .output_args(["-avoid_negative_ts", "make_zero"])
        .output_args(["-fflags", "+genpts+igndts"]);

    FfmpegRunner::new().with_timeout(timeout_secs).run(&cmd).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use laddr_models::WatermarkPosition;

    #[test]
    fn filter_chain_scales_to_target_height() {
        assert_eq!(build_filter_chain(Resolution::P720, None), "scale=-2:720");
        assert_eq!(build_filter_chain(Resolution::P320, None), "scale=-2:320");
    }

    #[test]
    fn filter_chain_appends_watermark() {
        let wm = WatermarkOptions {
            text: "demo".to_string(),
            position: WatermarkPosition::TopLeft,
            font_size: 24,
            opacity: 0.5,
        };
        let chain = build_filter_chain(Resolution::P480, Some(&wm));
        assert!(chain.starts_with("scale=-2:480,drawtext=text='demo':"));
    }

    #[test]
    fn blank_watermark_text_is_skipped() {
        let wm = WatermarkOptions {
            text: "   ".to_string(),
            ..WatermarkOptions::default()
        };
        assert_eq!(build_filter_chain(Resolution::P1080, Some(&wm)), "scale=-2:1080");
    }
}
