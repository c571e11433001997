//! Pipeline status store for status queries.
//!
//! One Redis hash per video holding the coarse state and, once terminal,
//! the serialized result object. Status queries always see a well-formed
//! result even on failure.

use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

use laddr_models::{PipelineResult, PipelineState, VideoId};

use crate::error::{QueueError, QueueResult};

/// Status entries expire a week after the last write.
const STATUS_TTL_SECS: i64 = 7 * 24 * 3600;

/// Snapshot returned to status queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Coarse pipeline state
    pub state: PipelineState,
    /// Terminal result, present once the pipeline finished either way
    pub result: Option<PipelineResult>,
}

/// Status store client.
#[derive(Clone)]
pub struct StatusStore {
    client: redis::Client,
}

impl StatusStore {
    /// Create a new status store handle.
    pub fn new(redis_url: &str) -> QueueResult<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| QueueError::connection_failed(e.to_string()))?;
        Ok(Self { client })
    }

    fn key(video_id: &VideoId) -> String {
        format!("laddr:status:{video_id}")
    }

    /// Mark a video as processing. Clears any stale result from a
    /// previous run of the same video.
    pub async fn mark_processing(&self, video_id: &VideoId) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = Self::key(video_id);

        conn.hset::<_, _, _, ()>(&key, "state", PipelineState::Processing.as_str())
            .await?;
        conn.hdel::<_, _, ()>(&key, "result").await?;
        conn.expire::<_, ()>(&key, STATUS_TTL_SECS).await?;
        Ok(())
    }

    /// Store the terminal result. State becomes completed or failed based
    /// on the result's success flag.
    pub async fn complete(&self, video_id: &VideoId, result: &PipelineResult) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = Self::key(video_id);

        let state = if result.success {
            PipelineState::Completed
        } else {
            PipelineState::Failed
        };

        conn.hset::<_, _, _, ()>(&key, "state", state.as_str()).await?;
        conn.hset::<_, _, _, ()>(&key, "result", serde_json::to_string(result)?)
            .await?;
        conn.expire::<_, ()>(&key, STATUS_TTL_SECS).await?;
        Ok(())
    }

    /// Fetch the current status, or None if the video is unknown.
    pub async fn get(&self, video_id: &VideoId) -> QueueResult<Option<StatusSnapshot>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = Self::key(video_id);

        let state: Option<String> = conn.hget(&key, "state").await?;
        let Some(state) = state else {
            return Ok(None);
        };

        let state: PipelineState = serde_json::from_str(&format!("\"{state}\""))?;
        let result: Option<String> = conn.hget(&key, "result").await?;
        let result = match result {
            Some(payload) => Some(serde_json::from_str(&payload)?),
            None => None,
        };

        Ok(Some(StatusSnapshot { state, result }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_keys_are_video_scoped() {
        assert_eq!(
            StatusStore::key(&VideoId::from_string("v1")),
            "laddr:status:v1"
        );
    }

    #[test]
    fn snapshot_serde_roundtrip() {
        let snapshot = StatusSnapshot {
            state: PipelineState::Failed,
            result: Some(PipelineResult::failed(
                VideoId::from_string("v1"),
                "splitting",
                "ffmpeg exited 1",
            )),
        };
        let json = serde_json::to_string(&snapshot).expect("serialize snapshot");
        let decoded: StatusSnapshot = serde_json::from_str(&json).expect("deserialize snapshot");
        assert_eq!(decoded.state, PipelineState::Failed);
        assert!(!decoded.result.unwrap().success);
    }
}
