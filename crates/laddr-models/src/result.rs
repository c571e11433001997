//! Work-unit outcomes, warnings, errors, and the terminal pipeline result.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::rendition::{RenditionVariant, Resolution};
use crate::video::VideoId;

/// Outcome of one (chunk, resolution) transcode work unit.
///
/// Produced exactly once per settled unit and persisted in the result
/// ledger, so a resumed pipeline never re-runs settled work.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TranscodeOutcome {
    /// Chunk index this unit covers
    pub chunk_index: u32,
    /// Target resolution
    pub resolution: Resolution,
    /// Storage key of the transcoded segment, present on success
    pub output_key: Option<String>,
    /// Whether the unit succeeded
    pub success: bool,
    /// Failure description, present when `success` is false
    pub error: Option<String>,
    /// Number of attempts it took to settle this unit
    pub attempts: u32,
}

impl TranscodeOutcome {
    pub fn succeeded(chunk_index: u32, resolution: Resolution, output_key: String, attempts: u32) -> Self {
        Self {
            chunk_index,
            resolution,
            output_key: Some(output_key),
            success: true,
            error: None,
            attempts,
        }
    }

    pub fn failed(chunk_index: u32, resolution: Resolution, error: String, attempts: u32) -> Self {
        Self {
            chunk_index,
            resolution,
            output_key: None,
            success: false,
            error: Some(error),
            attempts,
        }
    }
}

/// A non-fatal problem recorded during processing.
///
/// Optional-branch failures and dropped resolutions end up here; they
/// never fail the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Warning {
    /// Component that produced the warning, e.g. "thumbnail" or "720p"
    pub component: String,
    /// Human-readable description
    pub message: String,
}

impl Warning {
    pub fn new(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// A fatal error attributed to a pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StageError {
    /// Stage that failed, e.g. "splitting"
    pub stage: String,
    /// Underlying cause
    pub message: String,
}

impl StageError {
    pub fn new(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

/// Identifies a failed work unit precisely enough to retry just that unit.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UnitError {
    /// Chunk index of the failed unit
    pub chunk_index: u32,
    /// Resolution of the failed unit
    pub resolution: Resolution,
    /// Failure description
    pub message: String,
}

/// Reference to the generated thumbnail.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ThumbnailInfo {
    /// Storage key of the thumbnail image
    pub key: String,
    /// Mode used to generate it
    pub mode: String,
}

/// One chapter in the detected chapter list.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Chapter {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Chapter title
    pub title: String,
}

impl Chapter {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Detected chapters plus the storage keys of the generated files.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChapterSet {
    /// Chapters in playback order
    pub chapters: Vec<Chapter>,
    /// Storage key of chapters.json
    pub json_key: String,
    /// Storage key of chapters.vtt
    pub vtt_key: String,
}

/// Coarse pipeline state exposed to status queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Processing,
    Completed,
    Failed,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Processing => "processing",
            PipelineState::Completed => "completed",
            PipelineState::Failed => "failed",
        }
    }
}

/// Probed dimensions and duration carried into the final result.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResultMetadata {
    pub width: u32,
    pub height: u32,
    pub duration_seconds: f64,
}

/// Terminal object produced by the pipeline coordinator.
///
/// Immutable once produced. `success` is true when at least one rendition
/// (or a deliberate zero-variant outcome for minimum-resolution sources)
/// was published; partial success still reports `success = true` with
/// warnings naming what was dropped.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PipelineResult {
    /// Overall success flag
    pub success: bool,
    /// Video this result belongs to
    pub video_id: VideoId,
    /// Probed source metadata, absent if probing never completed
    pub metadata: Option<ResultMetadata>,
    /// Complete renditions, highest bandwidth first
    pub variants: Vec<RenditionVariant>,
    /// Storage key of the master playlist, present when any variant exists
    pub master_playlist_key: Option<String>,
    /// Thumbnail reference, if one was generated
    pub thumbnail: Option<ThumbnailInfo>,
    /// Detected chapters, if chapter detection was enabled and succeeded
    pub chapters: Option<Vec<Chapter>>,
    /// Non-fatal problems recorded along the way
    pub warnings: Vec<Warning>,
    /// Fatal stage errors (non-empty only when `success` is false)
    pub errors: Vec<StageError>,
    /// Failed work units, precise enough to retry individually
    pub failed_units: Vec<UnitError>,
}

impl PipelineResult {
    /// A total-failure result attributed to the given stage.
    pub fn failed(video_id: VideoId, stage: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            success: false,
            video_id,
            metadata: None,
            variants: Vec::new(),
            master_playlist_key: None,
            thumbnail: None,
            chapters: None,
            warnings: Vec::new(),
            errors: vec![StageError::new(stage, cause)],
            failed_units: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_constructors_set_flags() {
        let ok = TranscodeOutcome::succeeded(3, Resolution::P720, "k".into(), 1);
        assert!(ok.success);
        assert_eq!(ok.output_key.as_deref(), Some("k"));
        assert!(ok.error.is_none());

        let bad = TranscodeOutcome::failed(3, Resolution::P720, "boom".into(), 4);
        assert!(!bad.success);
        assert!(bad.output_key.is_none());
        assert_eq!(bad.attempts, 4);
    }

    #[test]
    fn failed_result_has_stage_error_and_no_variants() {
        let result = PipelineResult::failed(VideoId::from_string("v1"), "splitting", "ffmpeg exited 1");
        assert!(!result.success);
        assert!(result.variants.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].stage, "splitting");
    }

    #[test]
    fn pipeline_state_names() {
        assert_eq!(PipelineState::Processing.as_str(), "processing");
        let json = serde_json::to_string(&PipelineState::Completed).expect("serialize");
        assert_eq!(json, "\"completed\"");
    }

    #[test]
    fn outcome_roundtrips_through_ledger_serialization() {
        let outcome = TranscodeOutcome::succeeded(0, Resolution::P320, "v1/outputs/320p/segments/seg_0000.ts".into(), 2);
        let json = serde_json::to_string(&outcome).expect("serialize outcome");
        let decoded: TranscodeOutcome = serde_json::from_str(&json).expect("deserialize outcome");
        assert_eq!(decoded.chunk_index, 0);
        assert_eq!(decoded.resolution, Resolution::P320);
        assert!(decoded.success);
    }
}
