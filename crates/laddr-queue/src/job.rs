//! Job types for the queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use laddr_models::{JobId, ProcessingOptions, QualityPreset, Resolution, VideoId, WatermarkOptions};

/// Job to run the full pipeline for one video.
///
/// Consumed by coordinator workers on the pipeline stream. Re-delivering
/// this job to a video with settled ledger entries resumes rather than
/// restarts: settled work units are never re-run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessVideoJob {
    /// Unique job ID
    pub job_id: JobId,
    /// Video ID
    pub video_id: VideoId,
    /// URL to download the source from; None when the source object
    /// already exists in storage
    pub source_url: Option<String>,
    /// Processing options
    pub options: ProcessingOptions,
    /// When the job was created
    pub created_at: DateTime<Utc>,
}

impl ProcessVideoJob {
    /// Create a new pipeline job.
    pub fn new(video_id: VideoId, source_url: Option<String>, options: ProcessingOptions) -> Self {
        Self {
            job_id: JobId::new(),
            video_id,
            source_url,
            options,
            created_at: Utc::now(),
        }
    }

    /// Generate idempotency key for deduplication.
    pub fn idempotency_key(&self) -> String {
        format!("process:{}", self.video_id)
    }
}

/// Job to transcode one (chunk, resolution) work unit.
///
/// The atomic unit of fan-out. Output key is derived from
/// (video, resolution, chunk index), so a retried unit overwrites its own
/// previous output and nothing else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeChunkJob {
    /// Unique job ID
    pub job_id: JobId,
    /// Video ID
    pub video_id: VideoId,
    /// Chunk index within the manifest
    pub chunk_index: u32,
    /// Target resolution
    pub resolution: Resolution,
    /// Storage key of the source chunk
    pub chunk_key: String,
    /// Optional watermark, applied during encode
    pub watermark: Option<WatermarkOptions>,
    /// Encoder preset
    #[serde(default)]
    pub quality_preset: QualityPreset,
    /// Pipeline job that fanned this unit out
    pub parent_job_id: JobId,
    /// When the job was created
    pub created_at: DateTime<Utc>,
}

impl TranscodeChunkJob {
    /// Create a new transcode unit.
    pub fn new(
        video_id: VideoId,
        chunk_index: u32,
        resolution: Resolution,
        chunk_key: impl Into<String>,
        parent_job_id: JobId,
    ) -> Self {
        Self {
            job_id: JobId::new(),
            video_id,
            chunk_index,
            resolution,
            chunk_key: chunk_key.into(),
            watermark: None,
            quality_preset: QualityPreset::default(),
            parent_job_id,
            created_at: Utc::now(),
        }
    }

    /// Set the watermark.
    pub fn with_watermark(mut self, watermark: Option<WatermarkOptions>) -> Self {
        self.watermark = watermark;
        self
    }

    /// Set the quality preset.
    pub fn with_quality_preset(mut self, preset: QualityPreset) -> Self {
        self.quality_preset = preset;
        self
    }

    /// Generate idempotency key for deduplication.
    pub fn idempotency_key(&self) -> String {
        format!(
            "transcode:{}:{}:{}",
            self.video_id,
            self.resolution.name(),
            self.chunk_index
        )
    }
}

/// Generic job wrapper for queue storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueJob {
    /// Coordinator job: run the whole pipeline for a video
    ProcessVideo(ProcessVideoJob),
    /// Fine-grained job: transcode a single (chunk, resolution) unit
    TranscodeChunk(TranscodeChunkJob),
}

impl QueueJob {
    pub fn job_id(&self) -> &JobId {
        match self {
            QueueJob::ProcessVideo(j) => &j.job_id,
            QueueJob::TranscodeChunk(j) => &j.job_id,
        }
    }

    pub fn video_id(&self) -> &VideoId {
        match self {
            QueueJob::ProcessVideo(j) => &j.video_id,
            QueueJob::TranscodeChunk(j) => &j.video_id,
        }
    }

    pub fn idempotency_key(&self) -> String {
        match self {
            QueueJob::ProcessVideo(j) => j.idempotency_key(),
            QueueJob::TranscodeChunk(j) => j.idempotency_key(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_video_job_serde_roundtrip() {
        let job = ProcessVideoJob::new(
            VideoId::from_string("v1"),
            Some("https://example.com/source.mp4".to_string()),
            ProcessingOptions::default(),
        );
        let wrapper = QueueJob::ProcessVideo(job.clone());
        let json = serde_json::to_string(&wrapper).expect("serialize QueueJob");
        assert!(json.contains("\"type\":\"process_video\""));

        let decoded: QueueJob = serde_json::from_str(&json).expect("deserialize QueueJob");
        match decoded {
            QueueJob::ProcessVideo(j) => {
                assert_eq!(j.job_id, job.job_id);
                assert_eq!(j.video_id, job.video_id);
                assert_eq!(j.source_url, job.source_url);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn transcode_job_idempotency_key_is_unit_scoped() {
        let parent = JobId::new();
        let a = TranscodeChunkJob::new(
            VideoId::from_string("v1"),
            5,
            Resolution::P720,
            "v1/source/chunks/chunk_0005.mp4",
            parent.clone(),
        );
        let b = TranscodeChunkJob::new(
            VideoId::from_string("v1"),
            5,
            Resolution::P720,
            "v1/source/chunks/chunk_0005.mp4",
            parent,
        );
        // Same unit, different job ids: the dedup key must still collide.
        assert_eq!(a.idempotency_key(), b.idempotency_key());
        assert_eq!(a.idempotency_key(), "transcode:v1:720p:5");
    }

    #[test]
    fn transcode_job_defaults_quality_preset_when_absent() {
        let json = r#"{
            "type": "transcode_chunk",
            "job_id": "j1",
            "video_id": "v1",
            "chunk_index": 0,
            "resolution": "480p",
            "chunk_key": "v1/source/chunks/chunk_0000.mp4",
            "watermark": null,
            "parent_job_id": "p1",
            "created_at": "2026-01-01T00:00:00Z"
        }"#;
        let decoded: QueueJob = serde_json::from_str(json).expect("deserialize legacy payload");
        match decoded {
            QueueJob::TranscodeChunk(j) => {
                assert_eq!(j.quality_preset, QualityPreset::Medium)
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
