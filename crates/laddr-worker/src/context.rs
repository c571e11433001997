//! Shared state handed to every job handler.

use laddr_queue::{JobQueue, QueueConfig, ResultLedger, StatusStore, Stream};
use laddr_storage::ObjectStore;

use crate::config::WorkerConfig;
use crate::error::WorkerResult;

/// Everything a job handler needs: storage, queues, ledger, status store.
pub struct WorkerContext {
    pub config: WorkerConfig,
    pub store: ObjectStore,
    pub ledger: ResultLedger,
    pub status: StatusStore,
    /// Fan-out dispatch target; coordinators enqueue transcode units here.
    pub transcode_queue: JobQueue,
}

impl WorkerContext {
    /// Build the context from environment configuration and make sure the
    /// transcode stream's consumer group exists before anything fans out.
    pub async fn new(config: WorkerConfig) -> WorkerResult<Self> {
        let queue_config = QueueConfig::from_env();

        let store = ObjectStore::from_env()?;
        let ledger = ResultLedger::new(&queue_config.redis_url)?;
        let status = StatusStore::new(&queue_config.redis_url)?;
        let transcode_queue = JobQueue::new(queue_config, Stream::Transcode)?;
        transcode_queue.init().await?;

        tokio::fs::create_dir_all(&config.work_dir).await?;

        Ok(Self {
            config,
            store,
            ledger,
            status,
            transcode_queue,
        })
    }
}
