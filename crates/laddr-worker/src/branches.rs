//! Optional pipeline branches: thumbnail extraction and chapter detection.
//!
//! Both run concurrently with the transcode fan-out and both are
//! best-effort: a failure here becomes a warning on the final result,
//! never a pipeline failure.

use std::path::Path;

use tracing::info;

use laddr_media::{
    build_chapters, detect_scene_timestamps, extract_thumbnail, render_chapters_json,
    render_webvtt, resolve_plan,
};
use laddr_models::{ChapterOptions, ChapterSet, ThumbnailInfo, ThumbnailOptions, VideoId};
use laddr_storage::StoragePaths;

use crate::context::WorkerContext;
use crate::error::WorkerResult;

/// Generate and publish the thumbnail for a video.
///
/// A caller-uploaded image takes precedence over frame extraction: it is
/// copied verbatim to the published thumbnail key.
pub async fn generate_thumbnail(
    ctx: &WorkerContext,
    video_id: &VideoId,
    source: &Path,
    options: &ThumbnailOptions,
    duration: f64,
) -> WorkerResult<ThumbnailInfo> {
    let thumbnail_key = StoragePaths::thumbnail(video_id);

    if let Some(custom_key) = &options.custom_image_key {
        let bytes = ctx.store.download_bytes(custom_key).await?;
        ctx.store
            .upload_bytes(bytes, &thumbnail_key, "image/jpeg")
            .await?;
        info!(video_id = %video_id, from = %custom_key, "custom thumbnail published");
        return Ok(ThumbnailInfo {
            key: thumbnail_key,
            mode: "custom_image".to_string(),
        });
    }

    let plan = resolve_plan(options, duration)?;

    let workspace = tempfile::tempdir_in(&ctx.config.work_dir)?;
    let local = workspace.path().join("thumbnail.jpg");
    extract_thumbnail(source, &local, &plan, ctx.config.thumbnail_timeout.as_secs()).await?;

    ctx.store
        .upload_file(&local, &thumbnail_key, "image/jpeg")
        .await?;

    info!(video_id = %video_id, mode = %plan.label(), "thumbnail published");
    Ok(ThumbnailInfo {
        key: thumbnail_key,
        mode: plan.label(),
    })
}

/// Detect scene-change chapters and publish the JSON and WebVTT files.
pub async fn detect_chapters(
    ctx: &WorkerContext,
    video_id: &VideoId,
    source: &Path,
    options: &ChapterOptions,
    duration: f64,
) -> WorkerResult<ChapterSet> {
    let scene_times = detect_scene_timestamps(
        source,
        options.scene_threshold,
        ctx.config.scene_timeout.as_secs(),
    )
    .await?;

    let chapters = build_chapters(&scene_times, duration, options);

    let json = render_chapters_json(&chapters, video_id, duration)?;
    let json_key = StoragePaths::chapters_json(video_id);
    ctx.store
        .upload_bytes(json.into_bytes(), &json_key, "application/json")
        .await?;

    let vtt = render_webvtt(&chapters, video_id);
    let vtt_key = StoragePaths::chapters_vtt(video_id);
    ctx.store
        .upload_bytes(vtt.into_bytes(), &vtt_key, "text/vtt")
        .await?;

    info!(
        video_id = %video_id,
        chapter_count = chapters.len(),
        "chapters published"
    );
    Ok(ChapterSet {
        chapters,
        json_key,
        vtt_key,
    })
}
