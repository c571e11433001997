//! Object key layout for the pipeline.
//!
//! These paths are a published contract with playback consumers; every
//! key is computed from (video, purpose) or (video, resolution, index)
//! so concurrent writers never touch the same object.

use laddr_models::{Resolution, VideoId};

/// Key builders for every object the pipeline writes.
pub struct StoragePaths;

impl StoragePaths {
    /// The downloaded source file: `{id}/source/source.{ext}`.
    pub fn source_video(video_id: &VideoId, ext: &str) -> String {
        format!("{video_id}/source/source.{ext}")
    }

    /// One stream-copied chunk: `{id}/source/chunks/chunk_%04d.{ext}`.
    pub fn source_chunk(video_id: &VideoId, index: u32, ext: &str) -> String {
        format!("{video_id}/source/chunks/chunk_{index:04}.{ext}")
    }

    /// The chunk manifest: `{id}/source/manifest.json`.
    pub fn source_manifest(video_id: &VideoId) -> String {
        format!("{video_id}/source/manifest.json")
    }

    /// One transcoded segment: `{id}/outputs/{res}/segments/seg_%04d.ts`.
    pub fn output_segment(video_id: &VideoId, resolution: Resolution, index: u32) -> String {
        format!(
            "{video_id}/outputs/{}/segments/seg_{index:04}.ts",
            resolution.name()
        )
    }

    /// A variant playlist: `{id}/outputs/{res}/playlist.m3u8`.
    pub fn variant_playlist(video_id: &VideoId, resolution: Resolution) -> String {
        format!("{video_id}/outputs/{}/playlist.m3u8", resolution.name())
    }

    /// The master playlist: `{id}/outputs/master.m3u8`.
    pub fn master_playlist(video_id: &VideoId) -> String {
        format!("{video_id}/outputs/master.m3u8")
    }

    /// Chapter JSON document: `{id}/outputs/chapters.json`.
    pub fn chapters_json(video_id: &VideoId) -> String {
        format!("{video_id}/outputs/chapters.json")
    }

    /// Chapter WebVTT file: `{id}/outputs/chapters.vtt`.
    pub fn chapters_vtt(video_id: &VideoId) -> String {
        format!("{video_id}/outputs/chapters.vtt")
    }

    /// Thumbnail image: `{id}/outputs/thumbnail.jpg`.
    pub fn thumbnail(video_id: &VideoId) -> String {
        format!("{video_id}/outputs/thumbnail.jpg")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vid() -> VideoId {
        VideoId::from_string("abc123")
    }

    #[test]
    fn source_keys_match_published_layout() {
        assert_eq!(StoragePaths::source_video(&vid(), "mp4"), "abc123/source/source.mp4");
        assert_eq!(
            StoragePaths::source_chunk(&vid(), 0, "mp4"),
            "abc123/source/chunks/chunk_0000.mp4"
        );
        assert_eq!(
            StoragePaths::source_chunk(&vid(), 1234, "mp4"),
            "abc123/source/chunks/chunk_1234.mp4"
        );
        assert_eq!(
            StoragePaths::source_manifest(&vid()),
            "abc123/source/manifest.json"
        );
    }

    #[test]
    fn output_keys_match_published_layout() {
        assert_eq!(
            StoragePaths::output_segment(&vid(), Resolution::P720, 5),
            "abc123/outputs/720p/segments/seg_0005.ts"
        );
        assert_eq!(
            StoragePaths::variant_playlist(&vid(), Resolution::P480),
            "abc123/outputs/480p/playlist.m3u8"
        );
        assert_eq!(
            StoragePaths::master_playlist(&vid()),
            "abc123/outputs/master.m3u8"
        );
    }

    #[test]
    fn auxiliary_keys_match_published_layout() {
        assert_eq!(StoragePaths::chapters_json(&vid()), "abc123/outputs/chapters.json");
        assert_eq!(StoragePaths::chapters_vtt(&vid()), "abc123/outputs/chapters.vtt");
        assert_eq!(StoragePaths::thumbnail(&vid()), "abc123/outputs/thumbnail.jpg");
    }
}
