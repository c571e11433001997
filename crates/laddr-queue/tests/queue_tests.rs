//! Redis queue integration tests.
//!
//! These tests require a running Redis instance.
//! Run with: `cargo test -p laddr-queue -- --ignored`

use laddr_models::{PipelineResult, PipelineState, ProcessingOptions, VideoId};
use laddr_queue::{JobQueue, PipelineClient, ProcessVideoJob, QueueConfig, StatusStore, Stream};

fn test_config() -> QueueConfig {
    QueueConfig {
        redis_url: std::env::var("REDIS_URL")
            .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
        ..QueueConfig::default()
    }
}

/// Resubmitting a video whose dedup key is still live must be rejected
/// without disturbing the stored terminal result.
#[tokio::test]
#[ignore = "requires Redis"]
async fn rejected_resubmission_keeps_the_terminal_status() {
    dotenvy::dotenv().ok();

    let config = test_config();
    let client = PipelineClient::new(config.clone()).expect("Failed to create client");
    let status = StatusStore::new(&config.redis_url).expect("Failed to create status store");

    let video_id = VideoId::new();

    client
        .start_pipeline(video_id.clone(), None, ProcessingOptions::default())
        .await
        .expect("Failed to submit pipeline");

    // Pipeline reaches a terminal state.
    let result = PipelineResult::failed(video_id.clone(), "probing_metadata", "not a video");
    status
        .complete(&video_id, &result)
        .await
        .expect("Failed to store result");

    // The dedup key is still live, so the resubmission is rejected.
    let err = client
        .start_pipeline(video_id.clone(), None, ProcessingOptions::default())
        .await
        .expect_err("Expected duplicate rejection");
    assert!(err.is_duplicate());

    // The terminal result must survive the rejected attempt.
    let snapshot = status
        .get(&video_id)
        .await
        .expect("Failed to query status")
        .expect("Video should be known");
    assert_eq!(snapshot.state, PipelineState::Failed);
    assert!(snapshot.result.is_some());
}

/// Clearing the dedup key (what the executor does on ack and DLQ) opens
/// the door for an immediate resubmission.
#[tokio::test]
#[ignore = "requires Redis"]
async fn cleared_dedup_key_allows_resubmission() {
    dotenvy::dotenv().ok();

    let queue = JobQueue::new(test_config(), Stream::Pipeline).expect("Failed to create queue");
    queue.init().await.expect("Failed to init queue");

    let video_id = VideoId::new();
    let job = ProcessVideoJob::new(video_id.clone(), None, ProcessingOptions::default());
    let idempotency_key = job.idempotency_key();

    queue.enqueue_process(job).await.expect("Failed to enqueue");

    let duplicate = ProcessVideoJob::new(video_id.clone(), None, ProcessingOptions::default());
    let err = queue
        .enqueue_process(duplicate)
        .await
        .expect_err("Expected duplicate rejection");
    assert!(err.is_duplicate());

    queue
        .clear_dedup(&idempotency_key)
        .await
        .expect("Failed to clear dedup key");

    let resubmission = ProcessVideoJob::new(video_id, None, ProcessingOptions::default());
    queue
        .enqueue_process(resubmission)
        .await
        .expect("Resubmission should be accepted after dedup clear");
}
