//! Shared data models for the Laddr pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Video assets and chunk manifests
//! - The resolution ladder and selection policy
//! - Processing options (thumbnail, watermark, chapters)
//! - Transcode work-unit outcomes and rendition variants
//! - Pipeline states and the terminal result object

pub mod chunk;
pub mod options;
pub mod rendition;
pub mod result;
pub mod video;

// Re-export common types
pub use chunk::{Chunk, ChunkManifest};
pub use options::{
    ChapterOptions, ProcessingOptions, QualityPreset, ThumbnailMode, ThumbnailOptions,
    WatermarkOptions, WatermarkPosition,
};
pub use rendition::{select_renditions, RenditionVariant, Resolution, RESOLUTION_LADDER};
pub use result::{
    Chapter, ChapterSet, PipelineResult, PipelineState, ResultMetadata, StageError,
    ThumbnailInfo, TranscodeOutcome, UnitError, Warning,
};
pub use video::{JobId, VideoAsset, VideoId};
