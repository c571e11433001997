//! Front-door client: start pipelines and query their status.

use tracing::info;

use laddr_models::{JobId, ProcessingOptions, VideoId};

use crate::error::QueueResult;
use crate::job::ProcessVideoJob;
use crate::queue::{JobQueue, QueueConfig, Stream};
use crate::status::{StatusSnapshot, StatusStore};

/// Client for submitting pipeline jobs and reading their status.
pub struct PipelineClient {
    queue: JobQueue,
    status: StatusStore,
}

impl PipelineClient {
    /// Create a new client.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let status = StatusStore::new(&config.redis_url)?;
        let queue = JobQueue::new(config, Stream::Pipeline)?;
        Ok(Self { queue, status })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    /// Submit a pipeline run for a video. Returns the job handle.
    ///
    /// `source_url` of None means the source object is expected to already
    /// exist in storage.
    pub async fn start_pipeline(
        &self,
        video_id: VideoId,
        source_url: Option<String>,
        options: ProcessingOptions,
    ) -> QueueResult<JobId> {
        let job = ProcessVideoJob::new(video_id.clone(), source_url, options);
        let job_id = job.job_id.clone();

        // Enqueue before touching status: a rejected duplicate must leave
        // the stored terminal result of a previous run intact.
        self.queue.enqueue_process(job).await?;
        self.status.mark_processing(&video_id).await?;

        info!(video_id = %video_id, job_id = %job_id, "pipeline submitted");
        Ok(job_id)
    }

    /// Query the current status of a video.
    pub async fn get_status(&self, video_id: &VideoId) -> QueueResult<Option<StatusSnapshot>> {
        self.status.get(video_id).await
    }
}
