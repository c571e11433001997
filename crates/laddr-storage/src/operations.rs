//! Higher-level storage operations built on the raw client.

use laddr_models::ChunkManifest;
use tracing::info;

use crate::client::ObjectStore;
use crate::error::StorageResult;
use crate::paths::StoragePaths;

/// Store the chunk manifest for a video.
///
/// The manifest is written once, after every chunk upload succeeded; a
/// published manifest therefore always describes objects that exist.
pub async fn store_manifest(store: &ObjectStore, manifest: &ChunkManifest) -> StorageResult<String> {
    let key = StoragePaths::source_manifest(&manifest.video_id);
    let body = serde_json::to_vec_pretty(manifest)?;
    store.upload_bytes(body, &key, "application/json").await?;
    info!(video_id = %manifest.video_id, chunk_count = manifest.chunk_count, "manifest stored");
    Ok(key)
}

/// Load the chunk manifest for a video.
pub async fn load_manifest(
    store: &ObjectStore,
    video_id: &laddr_models::VideoId,
) -> StorageResult<ChunkManifest> {
    let key = StoragePaths::source_manifest(video_id);
    let bytes = store.download_bytes(&key).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
