//! Rendition assembly: variant playlists and the master playlist.

use tracing::info;

use laddr_media::{render_master_playlist, render_variant_playlist};
use laddr_models::{RenditionVariant, Resolution, VideoId};
use laddr_storage::{ObjectStore, StoragePaths};

use crate::error::WorkerResult;

const PLAYLIST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

/// Publish a variant playlist per complete resolution, then the master.
///
/// Returns the variant list (in the given order, which is highest
/// bandwidth first) and the master playlist key. With no complete
/// resolutions nothing is uploaded and the master key is None.
pub async fn publish_renditions(
    store: &ObjectStore,
    video_id: &VideoId,
    complete: &[Resolution],
    chunk_count: u32,
    segment_duration: f64,
) -> WorkerResult<(Vec<RenditionVariant>, Option<String>)> {
    let mut variants = Vec::with_capacity(complete.len());

    for &resolution in complete {
        let playlist = render_variant_playlist(chunk_count, segment_duration);
        let key = StoragePaths::variant_playlist(video_id, resolution);
        store
            .upload_bytes(playlist.into_bytes(), &key, PLAYLIST_CONTENT_TYPE)
            .await?;

        variants.push(RenditionVariant {
            resolution,
            playlist_key: key,
            bandwidth: resolution.bandwidth(),
            segment_count: chunk_count,
        });
    }

    if variants.is_empty() {
        return Ok((variants, None));
    }

    let master = render_master_playlist(&variants);
    let master_key = StoragePaths::master_playlist(video_id);
    store
        .upload_bytes(master.into_bytes(), &master_key, PLAYLIST_CONTENT_TYPE)
        .await?;

    info!(
        video_id = %video_id,
        variant_count = variants.len(),
        "renditions published"
    );
    Ok((variants, Some(master_key)))
}
