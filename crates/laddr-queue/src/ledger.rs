//! Persisted ledger of settled transcode work units.
//!
//! One Redis hash per video, one field per (resolution, chunk) unit.
//! The coordinator awaits fan-out completion by polling this ledger, and
//! a re-delivered pipeline job resumes by diffing desired units against
//! it. Once a unit is recorded here it is settled and never re-run.

use std::collections::HashMap;

use redis::AsyncCommands;
use tracing::debug;

use laddr_models::{Resolution, TranscodeOutcome, VideoId};

use crate::error::{QueueError, QueueResult};

/// Ledger entries expire a week after the last write.
const LEDGER_TTL_SECS: i64 = 7 * 24 * 3600;

/// Transcode result ledger.
#[derive(Clone)]
pub struct ResultLedger {
    client: redis::Client,
}

impl ResultLedger {
    /// Create a new ledger handle.
    pub fn new(redis_url: &str) -> QueueResult<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| QueueError::connection_failed(e.to_string()))?;
        Ok(Self { client })
    }

    fn key(video_id: &VideoId) -> String {
        format!("laddr:results:{video_id}")
    }

    fn field(resolution: Resolution, chunk_index: u32) -> String {
        format!("{}:{}", resolution.name(), chunk_index)
    }

    /// Record a settled unit. Overwriting an existing field is harmless:
    /// retried units produce equivalent outcomes.
    pub async fn record(&self, video_id: &VideoId, outcome: &TranscodeOutcome) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let key = Self::key(video_id);
        let field = Self::field(outcome.resolution, outcome.chunk_index);
        let payload = serde_json::to_string(outcome)?;

        conn.hset::<_, _, _, ()>(&key, &field, &payload).await?;
        conn.expire::<_, ()>(&key, LEDGER_TTL_SECS).await?;

        debug!(video_id = %video_id, field = %field, success = outcome.success, "outcome recorded");
        Ok(())
    }

    /// Look up one unit's outcome, if it has settled.
    pub async fn get(
        &self,
        video_id: &VideoId,
        resolution: Resolution,
        chunk_index: u32,
    ) -> QueueResult<Option<TranscodeOutcome>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let payload: Option<String> = conn
            .hget(Self::key(video_id), Self::field(resolution, chunk_index))
            .await?;

        match payload {
            Some(p) => Ok(Some(serde_json::from_str(&p)?)),
            None => Ok(None),
        }
    }

    /// Load every settled outcome for a video, keyed by (resolution, chunk).
    pub async fn load_all(
        &self,
        video_id: &VideoId,
    ) -> QueueResult<HashMap<(Resolution, u32), TranscodeOutcome>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let entries: HashMap<String, String> = conn.hgetall(Self::key(video_id)).await?;

        let mut outcomes = HashMap::with_capacity(entries.len());
        for payload in entries.values() {
            let outcome: TranscodeOutcome = serde_json::from_str(payload)?;
            outcomes.insert((outcome.resolution, outcome.chunk_index), outcome);
        }
        Ok(outcomes)
    }

    /// Drop the ledger for a video, e.g. before a forced full reprocess.
    pub async fn clear(&self, video_id: &VideoId) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del::<_, ()>(Self::key(video_id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_fields_are_unit_scoped() {
        assert_eq!(ResultLedger::field(Resolution::P720, 0), "720p:0");
        assert_eq!(ResultLedger::field(Resolution::P320, 42), "320p:42");
        assert_ne!(
            ResultLedger::field(Resolution::P720, 1),
            ResultLedger::field(Resolution::P480, 1)
        );
    }

    #[test]
    fn ledger_keys_are_video_scoped() {
        assert_eq!(
            ResultLedger::key(&VideoId::from_string("v1")),
            "laddr:results:v1"
        );
    }
}
