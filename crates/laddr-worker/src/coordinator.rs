//! Pipeline coordinator: the per-video state machine.
//!
//! Runs download, probe, split, fan-out, assembly, and finalization for
//! one video. Stage failures before fan-out produce a terminal failed
//! result; after fan-out the pipeline always proceeds to assembly so that
//! partial success can be published. Only infrastructure errors propagate
//! out of here, which leaves the queue message unacked for redelivery.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use laddr_media::{download_to_file, probe_video, split_into_chunks};
use laddr_models::{
    select_renditions, Chapter, ChapterSet, Chunk, ChunkManifest, PipelineResult, ResultMetadata,
    StageError, ThumbnailInfo, ThumbnailMode, ThumbnailOptions, VideoAsset, Warning,
};
use laddr_queue::ProcessVideoJob;
use laddr_storage::{load_manifest, store_manifest, StoragePaths};

use crate::assembler::publish_renditions;
use crate::branches::{detect_chapters, generate_thumbnail};
use crate::context::WorkerContext;
use crate::error::WorkerResult;
use crate::fanout;
use crate::retry::{retry_async, RetryConfig, RetryResult};

type ThumbnailTask = JoinHandle<WorkerResult<ThumbnailInfo>>;
type ChapterTask = JoinHandle<WorkerResult<ChapterSet>>;

/// Run the full pipeline for one video and store the terminal result.
pub async fn run_pipeline(ctx: &Arc<WorkerContext>, job: &ProcessVideoJob) -> WorkerResult<()> {
    ctx.status.mark_processing(&job.video_id).await?;

    let result = execute(ctx, job).await?;

    if result.success {
        info!(
            video_id = %job.video_id,
            variants = result.variants.len(),
            warnings = result.warnings.len(),
            "pipeline completed"
        );
    } else {
        error!(
            video_id = %job.video_id,
            errors = ?result.errors,
            "pipeline failed"
        );
    }

    ctx.status.complete(&job.video_id, &result).await?;
    Ok(())
}

async fn execute(ctx: &Arc<WorkerContext>, job: &ProcessVideoJob) -> WorkerResult<PipelineResult> {
    let video_id = &job.video_id;
    let workspace = tempfile::tempdir_in(&ctx.config.work_dir)?;

    // Acquire the source: reuse a previously stored object, otherwise
    // download and persist it so a resumed run skips this stage.
    let ext = source_extension(job.source_url.as_deref());
    let source_key = StoragePaths::source_video(video_id, &ext);
    let local_source = workspace.path().join(format!("source.{ext}"));

    if ctx.store.exists(&source_key).await? {
        info!(video_id = %video_id, key = %source_key, "source already stored, skipping download");
        ctx.store.download_file(&source_key, &local_source).await?;
    } else {
        let Some(url) = &job.source_url else {
            return Ok(PipelineResult::failed(
                video_id.clone(),
                "downloading",
                "no source url and no stored source object",
            ));
        };

        let download =
            tokio::time::timeout(ctx.config.download_timeout, download_to_file(url, &local_source))
                .await;
        match download {
            Err(_) => {
                return Ok(PipelineResult::failed(
                    video_id.clone(),
                    "downloading",
                    format!(
                        "download timed out after {}s",
                        ctx.config.download_timeout.as_secs()
                    ),
                ))
            }
            Ok(Err(e)) => {
                return Ok(PipelineResult::failed(
                    video_id.clone(),
                    "downloading",
                    e.to_string(),
                ))
            }
            Ok(Ok(_)) => {
                ctx.store
                    .upload_file(&local_source, &source_key, "video/mp4")
                    .await?;
            }
        }
    }

    // Probe. Everything downstream depends on real dimensions and duration.
    let probed = match probe_video(&local_source).await {
        Ok(p) => p,
        Err(e) => {
            return Ok(PipelineResult::failed(
                video_id.clone(),
                "probing_metadata",
                e.to_string(),
            ))
        }
    };

    let asset = VideoAsset {
        id: video_id.clone(),
        source_key: source_key.clone(),
        width: probed.width,
        height: probed.height,
        duration_seconds: probed.duration,
        frame_rate: probed.fps,
    };
    let metadata = ResultMetadata {
        width: asset.width,
        height: asset.height,
        duration_seconds: asset.duration_seconds,
    };
    info!(
        video_id = %video_id,
        width = asset.width,
        height = asset.height,
        duration = asset.duration_seconds,
        "source probed"
    );

    // Optional branches run concurrently with everything below.
    let (thumbnail_task, chapter_task) =
        spawn_branches(ctx, job, &asset, &local_source);

    let targets = select_renditions(asset.height, &job.options.target_resolutions);

    if targets.is_empty() {
        let (thumbnail, chapters, mut warnings) =
            join_branches(thumbnail_task, chapter_task).await;
        warnings.push(Warning::new(
            "transcoding",
            "source is already at or below the lowest ladder rung; nothing to transcode",
        ));
        return Ok(PipelineResult {
            success: true,
            video_id: video_id.clone(),
            metadata: Some(metadata),
            variants: Vec::new(),
            master_playlist_key: None,
            thumbnail,
            chapters,
            warnings,
            errors: Vec::new(),
            failed_units: Vec::new(),
        });
    }

    // A stored manifest pins the chunking for this video: settled ledger
    // entries are keyed by chunk index, so a redelivered job must reuse
    // the chunking they settled under, never re-split.
    let manifest_key = StoragePaths::source_manifest(video_id);
    let manifest = if ctx.store.exists(&manifest_key).await? {
        info!(video_id = %video_id, "manifest already stored, reusing chunking");
        load_manifest(&ctx.store, video_id).await?
    } else {
        // Split and persist chunks plus the manifest. Transient ffmpeg
        // failures get a couple of retries; anything else is fatal.
        let chunks_dir = workspace.path().join("chunks");
        let split_retry = RetryConfig::new(format!("split {video_id}"))
            .with_max_retries(2)
            .with_base_delay(ctx.config.unit_retry_base)
            .with_max_delay(ctx.config.unit_retry_cap);
        let split_result = retry_async(
            &split_retry,
            || {
                split_into_chunks(
                    &local_source,
                    &chunks_dir,
                    ctx.config.chunk_duration,
                    ctx.config.split_timeout.as_secs(),
                )
            },
            |e| e.is_retryable(),
        )
        .await;
        let chunk_paths = match split_result {
            RetryResult::Success { value, .. } => value,
            RetryResult::Failed { error, .. } => {
                abort_branches(thumbnail_task, chapter_task);
                return Ok(PipelineResult::failed(
                    video_id.clone(),
                    "splitting",
                    error.to_string(),
                ));
            }
        };

        let manifest = upload_chunks(ctx, video_id, &chunk_paths, &ext, probed.size_bytes).await?;
        store_manifest(&ctx.store, &manifest).await?;
        manifest
    };

    // Fan out, await settlement, and decide which resolutions survive.
    let outcomes = fanout::run(ctx, job, &manifest, &targets).await?;
    let report = fanout::aggregate(&outcomes, &targets, manifest.chunk_count);

    let (variants, master_playlist_key) = publish_renditions(
        &ctx.store,
        video_id,
        &report.complete,
        manifest.chunk_count,
        manifest.chunk_duration_target,
    )
    .await?;

    let (thumbnail, chapters, mut warnings) = join_branches(thumbnail_task, chapter_task).await;
    warnings.extend(report.warnings);

    if variants.is_empty() {
        return Ok(PipelineResult {
            success: false,
            video_id: video_id.clone(),
            metadata: Some(metadata),
            variants,
            master_playlist_key,
            thumbnail,
            chapters,
            warnings,
            errors: vec![StageError::new("transcoding", "every rendition failed")],
            failed_units: report.failed_units,
        });
    }

    Ok(PipelineResult {
        success: true,
        video_id: video_id.clone(),
        metadata: Some(metadata),
        variants,
        master_playlist_key,
        thumbnail,
        chapters,
        warnings,
        errors: Vec::new(),
        failed_units: report.failed_units,
    })
}

fn spawn_branches(
    ctx: &Arc<WorkerContext>,
    job: &ProcessVideoJob,
    asset: &VideoAsset,
    local_source: &Path,
) -> (Option<ThumbnailTask>, Option<ChapterTask>) {
    let thumbnail_task = wants_thumbnail(&job.options.thumbnail).then(|| {
        let ctx = Arc::clone(ctx);
        let video_id = asset.id.clone();
        let source = local_source.to_path_buf();
        let options = job.options.thumbnail.clone();
        let duration = asset.duration_seconds;
        tokio::spawn(async move {
            generate_thumbnail(&ctx, &video_id, &source, &options, duration).await
        })
    });

    let chapter_task = job.options.chapters.enabled.then(|| {
        let ctx = Arc::clone(ctx);
        let video_id = asset.id.clone();
        let source = local_source.to_path_buf();
        let options = job.options.chapters.clone();
        let duration = asset.duration_seconds;
        tokio::spawn(
            async move { detect_chapters(&ctx, &video_id, &source, &options, duration).await },
        )
    });

    (thumbnail_task, chapter_task)
}

/// Collect branch results, downgrading failures to warnings.
async fn join_branches(
    thumbnail_task: Option<ThumbnailTask>,
    chapter_task: Option<ChapterTask>,
) -> (Option<ThumbnailInfo>, Option<Vec<Chapter>>, Vec<Warning>) {
    let mut warnings = Vec::new();

    let thumbnail = match thumbnail_task {
        None => None,
        Some(task) => match task.await {
            Ok(Ok(info)) => Some(info),
            Ok(Err(e)) => {
                warn!(error = %e, "thumbnail generation failed");
                warnings.push(Warning::new("thumbnail", e.to_string()));
                None
            }
            Err(e) => {
                warnings.push(Warning::new("thumbnail", format!("task aborted: {e}")));
                None
            }
        },
    };

    let chapters = match chapter_task {
        None => None,
        Some(task) => match task.await {
            Ok(Ok(set)) => Some(set.chapters),
            Ok(Err(e)) => {
                warn!(error = %e, "chapter detection failed");
                warnings.push(Warning::new("chapters", e.to_string()));
                None
            }
            Err(e) => {
                warnings.push(Warning::new("chapters", format!("task aborted: {e}")));
                None
            }
        },
    };

    (thumbnail, chapters, warnings)
}

fn abort_branches(thumbnail_task: Option<ThumbnailTask>, chapter_task: Option<ChapterTask>) {
    if let Some(task) = thumbnail_task {
        task.abort();
    }
    if let Some(task) = chapter_task {
        task.abort();
    }
}

/// Upload every chunk and build the manifest in index order.
async fn upload_chunks(
    ctx: &WorkerContext,
    video_id: &laddr_models::VideoId,
    chunk_paths: &[PathBuf],
    ext: &str,
    source_size_bytes: u64,
) -> WorkerResult<ChunkManifest> {
    let mut chunks = Vec::with_capacity(chunk_paths.len());

    for (index, path) in chunk_paths.iter().enumerate() {
        let index = index as u32;
        let size_bytes = tokio::fs::metadata(path).await?.len();
        let key = StoragePaths::source_chunk(video_id, index, ext);
        ctx.store.upload_file(path, &key, "video/mp4").await?;
        chunks.push(Chunk {
            index,
            key,
            size_bytes,
        });
    }

    Ok(ChunkManifest::new(
        video_id.clone(),
        f64::from(ctx.config.chunk_duration),
        source_size_bytes,
        chunks,
    ))
}

/// Mode `none` disables the thumbnail branch entirely, even when a custom
/// image key is present on the options.
fn wants_thumbnail(options: &ThumbnailOptions) -> bool {
    options.mode != ThumbnailMode::None
}

/// File extension from a source URL, defaulting to mp4.
fn source_extension(url: Option<&str>) -> String {
    url.and_then(|u| {
        let path = u.split(['?', '#']).next().unwrap_or(u);
        std::path::Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|e| e.to_ascii_lowercase())
    })
    .unwrap_or_else(|| "mp4".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_comes_from_the_url_path() {
        assert_eq!(source_extension(Some("https://cdn.example.com/v/clip.mkv")), "mkv");
        assert_eq!(
            source_extension(Some("https://cdn.example.com/v/clip.MOV?token=abc#t=5")),
            "mov"
        );
        assert_eq!(source_extension(Some("https://cdn.example.com/v/clip")), "mp4");
        assert_eq!(source_extension(None), "mp4");
    }

    #[test]
    fn mode_none_disables_the_thumbnail_branch() {
        let disabled = ThumbnailOptions {
            mode: ThumbnailMode::None,
            custom_timestamp: None,
            custom_image_key: Some("uploads/v1/cover.jpg".to_string()),
        };
        assert!(!wants_thumbnail(&disabled));

        let auto = ThumbnailOptions {
            mode: ThumbnailMode::Auto,
            ..ThumbnailOptions::default()
        };
        assert!(wants_thumbnail(&auto));
    }

    #[test]
    fn suspicious_extensions_fall_back_to_mp4() {
        assert_eq!(source_extension(Some("https://x.example/a.b%20c")), "mp4");
        assert_eq!(source_extension(Some("https://x.example/archive.verylongext")), "mp4");
    }
}
