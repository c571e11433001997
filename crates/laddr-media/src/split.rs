//! Keyframe-aligned source splitting via the segment muxer.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Default chunk duration in seconds; 4s is the common HLS segment length.
pub const DEFAULT_CHUNK_DURATION: u32 = 4;

/// Split a source file into chunks of roughly `chunk_duration` seconds.
///
/// Streams are copied, never re-encoded, so cuts land on keyframes and
/// actual chunk lengths vary with the source GOP structure. Returns the
/// chunk paths sorted by index; index order defines playback order.
pub async fn split_into_chunks(
    input: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
    chunk_duration: u32,
    timeout_secs: u64,
) -> MediaResult<Vec<PathBuf>> {
    let input = input.as_ref();
    let out_dir = out_dir.as_ref();

    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }
    tokio::fs::create_dir_all(out_dir).await?;

    let ext = input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("mp4")
        .to_string();
    let pattern = out_dir.join(format!("chunk_%04d.{ext}"));

    let cmd = FfmpegCommand::new(input, &pattern)
        .output_arg("-c")
        .output_arg("copy")
        .output_args(["-f", "segment"])
        .output_args(["-segment_time", &chunk_duration.to_string()])
        .output_args(["-reset_timestamps", "1"])
        .output_args(["-map", "0"]);

    FfmpegRunner::new().with_timeout(timeout_secs).run(&cmd).await?;

    let mut chunks = Vec::new();
    let mut entries = tokio::fs::read_dir(out_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("chunk_"))
            .unwrap_or(false)
        {
            chunks.push(path);
        }
    }
    chunks.sort();

    if chunks.is_empty() {
        return Err(MediaError::InvalidVideo(
            "segment muxer produced no chunks".to_string(),
        ));
    }

    info!(chunk_count = chunks.len(), "split complete");
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_is_rejected_before_spawning() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = tokio_test::block_on(split_into_chunks(
            "/nonexistent/input.mp4",
            dir.path(),
            DEFAULT_CHUNK_DURATION,
            10,
        ))
        .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
