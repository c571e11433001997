//! HLS playlist text generation.
//!
//! Pure functions over variant metadata; no IO. Segments are transcoded
//! independently with reset timestamps, so variant playlists carry a
//! discontinuity tag before every segment after the first.

use laddr_models::RenditionVariant;

/// Render a variant playlist for one resolution.
///
/// Segment paths are relative to the playlist's own directory:
/// `segments/seg_0000.ts` and so on, in chunk-index order.
pub fn render_variant_playlist(segment_count: u32, segment_duration: f64) -> String {
    let mut lines = vec![
        "#EXTM3U".to_string(),
        "#EXT-X-VERSION:3".to_string(),
        format!("#EXT-X-TARGETDURATION:{}", segment_duration as u64 + 1),
        "#EXT-X-MEDIA-SEQUENCE:0".to_string(),
        "#EXT-X-PLAYLIST-TYPE:VOD".to_string(),
        "#EXT-X-ALLOW-CACHE:YES".to_string(),
    ];

    for idx in 0..segment_count {
        if idx > 0 {
            lines.push("#EXT-X-DISCONTINUITY".to_string());
        }
        lines.push(format!("#EXTINF:{segment_duration:.3},"));
        lines.push(format!("segments/seg_{idx:04}.ts"));
    }

    lines.push("#EXT-X-ENDLIST".to_string());
    lines.join("\n")
}

/// Render the master playlist listing every complete variant.
///
/// Variants are ordered highest bandwidth first so players start at the
/// best quality; paths are relative (`{resolution}/playlist.m3u8`).
pub fn render_master_playlist(variants: &[RenditionVariant]) -> String {
    let mut sorted: Vec<&RenditionVariant> = variants.iter().collect();
    sorted.sort_by(|a, b| b.bandwidth.cmp(&a.bandwidth));

    let mut lines = vec!["#EXTM3U".to_string(), "#EXT-X-VERSION:3".to_string()];

    for variant in sorted {
        let height = variant.resolution.height();
        let width = variant.resolution.approx_width();
        lines.push(format!(
            "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={}x{},NAME=\"{}\"",
            variant.bandwidth,
            width,
            height,
            variant.resolution.name(),
        ));
        lines.push(format!("{}/playlist.m3u8", variant.resolution.name()));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use laddr_models::Resolution;

    fn variant(resolution: Resolution, segment_count: u32) -> RenditionVariant {
        RenditionVariant {
            resolution,
            playlist_key: format!("v1/outputs/{}/playlist.m3u8", resolution.name()),
            bandwidth: resolution.bandwidth(),
            segment_count,
        }
    }

    #[test]
    fn variant_playlist_references_every_segment_in_order() {
        let playlist = render_variant_playlist(3, 4.0);
        let lines: Vec<&str> = playlist.lines().collect();

        assert_eq!(lines[0], "#EXTM3U");
        assert!(playlist.contains("#EXT-X-TARGETDURATION:5"));
        assert!(playlist.contains("#EXT-X-PLAYLIST-TYPE:VOD"));

        let segments: Vec<&str> = lines
            .iter()
            .filter(|l| l.starts_with("segments/"))
            .copied()
            .collect();
        assert_eq!(
            segments,
            vec![
                "segments/seg_0000.ts",
                "segments/seg_0001.ts",
                "segments/seg_0002.ts"
            ]
        );
        assert_eq!(lines.last(), Some(&"#EXT-X-ENDLIST"));
    }

    #[test]
    fn variant_playlist_marks_discontinuities_between_segments() {
        let playlist = render_variant_playlist(3, 4.0);
        let count = playlist
            .lines()
            .filter(|l| *l == "#EXT-X-DISCONTINUITY")
            .count();
        assert_eq!(count, 2, "one discontinuity per segment after the first");
        // Never before the first segment.
        let first_segment_pos = playlist.find("segments/seg_0000.ts").unwrap();
        let first_disc_pos = playlist.find("#EXT-X-DISCONTINUITY").unwrap();
        assert!(first_disc_pos > first_segment_pos);
    }

    #[test]
    fn single_segment_playlist_has_no_discontinuity() {
        let playlist = render_variant_playlist(1, 4.0);
        assert!(!playlist.contains("#EXT-X-DISCONTINUITY"));
    }

    #[test]
    fn master_playlist_sorts_by_bandwidth_descending() {
        let variants = vec![
            variant(Resolution::P320, 10),
            variant(Resolution::P720, 10),
            variant(Resolution::P480, 10),
        ];
        let playlist = render_master_playlist(&variants);

        let p720 = playlist.find("720p/playlist.m3u8").unwrap();
        let p480 = playlist.find("480p/playlist.m3u8").unwrap();
        let p320 = playlist.find("320p/playlist.m3u8").unwrap();
        assert!(p720 < p480 && p480 < p320);

        assert!(playlist.contains("BANDWIDTH=2800000,RESOLUTION=1280x720,NAME=\"720p\""));
        assert!(playlist.contains("BANDWIDTH=800000,RESOLUTION=568x320,NAME=\"320p\""));
    }

    #[test]
    fn master_playlist_with_no_variants_is_just_the_header() {
        let playlist = render_master_playlist(&[]);
        assert_eq!(playlist, "#EXTM3U\n#EXT-X-VERSION:3");
    }
}
