//! FFmpeg CLI wrapper for the Laddr pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with hard timeouts
//! - Source probing via ffprobe
//! - Keyframe-aligned stream-copy splitting
//! - Per-chunk transcoding to MPEG-TS with optional watermark
//! - Thumbnail extraction and scene/chapter detection
//! - HLS playlist text generation (pure, no IO)

pub mod command;
pub mod download;
pub mod error;
pub mod playlist;
pub mod probe;
pub mod scenes;
pub mod split;
pub mod thumbnail;
pub mod transcode;
pub mod watermark;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegOutput, FfmpegRunner};
pub use download::download_to_file;
pub use error::{MediaError, MediaResult};
pub use playlist::{render_master_playlist, render_variant_playlist};
pub use probe::{probe_video, ProbedVideo};
pub use scenes::{
    build_chapters, detect_scene_timestamps, parse_scene_timestamps, render_chapters_json,
    render_webvtt,
};
pub use split::{split_into_chunks, DEFAULT_CHUNK_DURATION};
pub use thumbnail::{
    extract_thumbnail, format_timestamp, parse_timestamp, resolve_plan, ThumbnailPlan,
};
pub use transcode::{build_filter_chain, transcode_chunk_file};
pub use watermark::{build_watermark_filter, escape_drawtext};
