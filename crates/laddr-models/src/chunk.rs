//! Chunk and chunk manifest models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::video::VideoId;

/// One independently decodable slice of the source video.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Chunk {
    /// 0-based index; defines playback order and must never be reordered
    pub index: u32,
    /// Storage key of the chunk object
    pub key: String,
    /// Size in bytes
    pub size_bytes: u64,
}

/// Ordered manifest of the chunks produced by splitting one source video.
///
/// The single source of truth for how many chunks exist and in what order.
/// Every downstream stage derives counts from this, never recomputes them.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChunkManifest {
    /// Video this manifest belongs to
    pub video_id: VideoId,
    /// Number of chunks
    pub chunk_count: u32,
    /// Target chunk duration in seconds used at split time
    pub chunk_duration_target: f64,
    /// Source file size in bytes
    pub source_size_bytes: u64,
    /// Chunks in playback order
    pub chunks: Vec<Chunk>,
}

impl ChunkManifest {
    /// Build a manifest from chunks already in index order.
    pub fn new(
        video_id: VideoId,
        chunk_duration_target: f64,
        source_size_bytes: u64,
        chunks: Vec<Chunk>,
    ) -> Self {
        Self {
            video_id,
            chunk_count: chunks.len() as u32,
            chunk_duration_target,
            source_size_bytes,
            chunks,
        }
    }
}
