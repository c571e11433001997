//! Worker configuration.

use std::time::Duration;

use laddr_media::DEFAULT_CHUNK_DURATION;

use crate::error::{WorkerError, WorkerResult};

/// Which streams this worker process consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerRole {
    /// Pipeline coordination only (download, split, assemble)
    Pipeline,
    /// CPU-bound transcode units only
    Transcode,
    /// Both streams in one process
    #[default]
    All,
}

impl WorkerRole {
    /// Parse a role name. Returns `None` for unknown names.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "pipeline" => Some(WorkerRole::Pipeline),
            "transcode" => Some(WorkerRole::Transcode),
            "all" => Some(WorkerRole::All),
            _ => None,
        }
    }

    pub fn consumes_pipeline(&self) -> bool {
        matches!(self, WorkerRole::Pipeline | WorkerRole::All)
    }

    pub fn consumes_transcode(&self) -> bool {
        matches!(self, WorkerRole::Transcode | WorkerRole::All)
    }
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Streams this process consumes
    pub role: WorkerRole,
    /// Maximum concurrent jobs per stream
    pub max_concurrent_jobs: usize,
    /// Work directory for temporary files
    pub work_dir: String,
    /// Target chunk duration in seconds at split time
    pub chunk_duration: u32,
    /// Timeout for the source download
    pub download_timeout: Duration,
    /// Timeout for the splitting pass
    pub split_timeout: Duration,
    /// Timeout for one transcode work unit
    pub unit_timeout: Duration,
    /// Timeout for thumbnail extraction
    pub thumbnail_timeout: Duration,
    /// Timeout for the scene detection pass
    pub scene_timeout: Duration,
    /// Local retries per transcode unit before it settles as failed
    pub unit_max_retries: u32,
    /// Base delay for unit retry backoff (doubles each attempt)
    pub unit_retry_base: Duration,
    /// Cap for unit retry backoff
    pub unit_retry_cap: Duration,
    /// How often the coordinator polls the result ledger during fan-out
    pub ledger_poll_interval: Duration,
    /// How long the coordinator waits for all units before giving up
    pub fanout_timeout: Duration,
    /// How often the worker scans for orphaned pending jobs
    pub claim_interval: Duration,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            role: WorkerRole::All,
            max_concurrent_jobs: 2,
            work_dir: "/tmp/laddr".to_string(),
            chunk_duration: DEFAULT_CHUNK_DURATION,
            download_timeout: Duration::from_secs(600),
            split_timeout: Duration::from_secs(600),
            unit_timeout: Duration::from_secs(300),
            thumbnail_timeout: Duration::from_secs(60),
            scene_timeout: Duration::from_secs(300),
            unit_max_retries: 3,
            unit_retry_base: Duration::from_secs(2),
            unit_retry_cap: Duration::from_secs(30),
            ledger_poll_interval: Duration::from_secs(2),
            fanout_timeout: Duration::from_secs(3600),
            claim_interval: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl WorkerConfig {
    /// Create config from environment variables.
    ///
    /// An unknown `WORKER_ROLE` is an error: silently defaulting could
    /// make a fleet member consume streams it was not meant to.
    pub fn from_env() -> WorkerResult<Self> {
        let role = match std::env::var("WORKER_ROLE") {
            Ok(name) => WorkerRole::parse(&name).ok_or_else(|| {
                WorkerError::config_error(format!("unknown WORKER_ROLE '{name}'"))
            })?,
            Err(_) => WorkerRole::All,
        };

        let defaults = Self::default();
        Ok(Self {
            role,
            max_concurrent_jobs: std::env::var("WORKER_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_concurrent_jobs),
            work_dir: std::env::var("WORKER_WORK_DIR")
                .unwrap_or_else(|_| defaults.work_dir.clone()),
            chunk_duration: std::env::var("CHUNK_DURATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.chunk_duration),
            download_timeout: Duration::from_secs(env_u64("DOWNLOAD_TIMEOUT_SECS", 600)),
            split_timeout: Duration::from_secs(env_u64("SPLIT_TIMEOUT_SECS", 600)),
            unit_timeout: Duration::from_secs(env_u64("UNIT_TIMEOUT_SECS", 300)),
            thumbnail_timeout: Duration::from_secs(env_u64("THUMBNAIL_TIMEOUT_SECS", 60)),
            scene_timeout: Duration::from_secs(env_u64("SCENE_TIMEOUT_SECS", 300)),
            unit_max_retries: env_u64("UNIT_MAX_RETRIES", 3) as u32,
            unit_retry_base: Duration::from_secs(env_u64("UNIT_RETRY_BASE_SECS", 2)),
            unit_retry_cap: Duration::from_secs(env_u64("UNIT_RETRY_CAP_SECS", 30)),
            ledger_poll_interval: Duration::from_secs(env_u64("LEDGER_POLL_INTERVAL_SECS", 2)),
            fanout_timeout: Duration::from_secs(env_u64("FANOUT_TIMEOUT_SECS", 3600)),
            claim_interval: Duration::from_secs(env_u64("WORKER_CLAIM_INTERVAL_SECS", 30)),
            shutdown_timeout: Duration::from_secs(env_u64("WORKER_SHUTDOWN_TIMEOUT", 30)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing() {
        assert_eq!(WorkerRole::parse("pipeline"), Some(WorkerRole::Pipeline));
        assert_eq!(WorkerRole::parse("transcode"), Some(WorkerRole::Transcode));
        assert_eq!(WorkerRole::parse("all"), Some(WorkerRole::All));
        assert_eq!(WorkerRole::parse("everything"), None);
    }

    #[test]
    fn all_role_consumes_both_streams() {
        assert!(WorkerRole::All.consumes_pipeline());
        assert!(WorkerRole::All.consumes_transcode());
        assert!(!WorkerRole::Pipeline.consumes_transcode());
        assert!(!WorkerRole::Transcode.consumes_pipeline());
    }

    #[test]
    fn defaults_are_sane() {
        let config = WorkerConfig::default();
        assert_eq!(config.chunk_duration, 4);
        assert_eq!(config.unit_max_retries, 3);
        assert!(config.unit_retry_base < config.unit_retry_cap);
    }

    #[test]
    fn unknown_role_is_a_config_error() {
        std::env::set_var("WORKER_ROLE", "everything");
        let result = WorkerConfig::from_env();
        std::env::remove_var("WORKER_ROLE");
        assert!(result.is_err());
    }
}
