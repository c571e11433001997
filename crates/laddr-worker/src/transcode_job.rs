//! Handler for one (chunk, resolution) transcode work unit.
//!
//! A unit settles exactly once: either a segment is uploaded and a success
//! outcome recorded, or local retries are exhausted and a failure outcome
//! recorded. Either way the queue message is acked; the ledger is the
//! source of truth, not the stream.

use tracing::{debug, info, warn};

use laddr_media::transcode_chunk_file;
use laddr_models::TranscodeOutcome;
use laddr_queue::TranscodeChunkJob;
use laddr_storage::StoragePaths;

use crate::context::WorkerContext;
use crate::error::WorkerResult;
use crate::retry::{retry_async, RetryConfig, RetryResult};

/// Process one transcode unit.
///
/// Errors returned from here mean infrastructure trouble (storage or Redis
/// unreachable) and trigger queue-level redelivery; encode failures never
/// propagate, they settle the unit as failed.
pub async fn handle(ctx: &WorkerContext, job: &TranscodeChunkJob) -> WorkerResult<()> {
    // Re-delivered units that already settled are a no-op.
    if let Some(existing) = ctx
        .ledger
        .get(&job.video_id, job.resolution, job.chunk_index)
        .await?
    {
        debug!(
            video_id = %job.video_id,
            resolution = %job.resolution,
            chunk = job.chunk_index,
            success = existing.success,
            "unit already settled, skipping"
        );
        return Ok(());
    }

    let workspace = tempfile::tempdir_in(&ctx.config.work_dir)?;

    let ext = chunk_extension(&job.chunk_key);
    let input = workspace
        .path()
        .join(format!("chunk_{:04}.{ext}", job.chunk_index));
    ctx.store.download_file(&job.chunk_key, &input).await?;

    let output = workspace
        .path()
        .join(format!("seg_{:04}.ts", job.chunk_index));

    let retry = RetryConfig::new(format!(
        "transcode {}:{}:{}",
        job.video_id,
        job.resolution.name(),
        job.chunk_index
    ))
    .with_max_retries(ctx.config.unit_max_retries)
    .with_base_delay(ctx.config.unit_retry_base)
    .with_max_delay(ctx.config.unit_retry_cap);

    let result = retry_async(
        &retry,
        || {
            transcode_chunk_file(
                &input,
                &output,
                job.resolution,
                job.watermark.as_ref(),
                job.quality_preset,
                ctx.config.unit_timeout.as_secs(),
            )
        },
        |e| e.is_retryable(),
    )
    .await;

    let outcome = match result {
        RetryResult::Success { attempts, .. } => {
            let segment_key =
                StoragePaths::output_segment(&job.video_id, job.resolution, job.chunk_index);
            ctx.store
                .upload_file(&output, &segment_key, "video/mp2t")
                .await?;

            info!(
                video_id = %job.video_id,
                resolution = %job.resolution,
                chunk = job.chunk_index,
                attempts,
                "unit transcoded"
            );
            TranscodeOutcome::succeeded(job.chunk_index, job.resolution, segment_key, attempts)
        }
        RetryResult::Failed { error, attempts } => {
            warn!(
                video_id = %job.video_id,
                resolution = %job.resolution,
                chunk = job.chunk_index,
                attempts,
                error = %error,
                "unit failed permanently"
            );
            TranscodeOutcome::failed(job.chunk_index, job.resolution, error.to_string(), attempts)
        }
    };

    ctx.ledger.record(&job.video_id, &outcome).await?;
    Ok(())
}

/// File extension of a chunk object key, defaulting to mp4.
fn chunk_extension(key: &str) -> &str {
    std::path::Path::new(key)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("mp4")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_extension_comes_from_the_key() {
        assert_eq!(chunk_extension("v1/source/chunks/chunk_0000.mp4"), "mp4");
        assert_eq!(chunk_extension("v1/source/chunks/chunk_0001.mkv"), "mkv");
        assert_eq!(chunk_extension("no-extension"), "mp4");
    }
}
