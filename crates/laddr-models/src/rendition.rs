//! Resolution ladder and the rendition selection policy.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed resolution ladder, highest bandwidth first.
pub const RESOLUTION_LADDER: [Resolution; 4] = [
    Resolution::P1080,
    Resolution::P720,
    Resolution::P480,
    Resolution::P320,
];

/// Target rendition resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    #[serde(rename = "320p")]
    P320,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
}

impl Resolution {
    /// Ladder name, e.g. "720p".
    pub fn name(&self) -> &'static str {
        match self {
            Resolution::P320 => "320p",
            Resolution::P480 => "480p",
            Resolution::P720 => "720p",
            Resolution::P1080 => "1080p",
        }
    }

    /// Target height in pixels.
    pub fn height(&self) -> u32 {
        match self {
            Resolution::P320 => 320,
            Resolution::P480 => 480,
            Resolution::P720 => 720,
            Resolution::P1080 => 1080,
        }
    }

    /// Bandwidth estimate in bits/second, used for adaptive playlist ordering.
    pub fn bandwidth(&self) -> u64 {
        match self {
            Resolution::P320 => 800_000,
            Resolution::P480 => 1_400_000,
            Resolution::P720 => 2_800_000,
            Resolution::P1080 => 5_000_000,
        }
    }

    /// Approximate width at 16:9 aspect ratio.
    pub fn approx_width(&self) -> u32 {
        self.height() * 16 / 9
    }

    /// Parse a ladder name. Returns `None` for names outside the ladder.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "320p" => Some(Resolution::P320),
            "480p" => Some(Resolution::P480),
            "720p" => Some(Resolution::P720),
            "1080p" => Some(Resolution::P1080),
            _ => None,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Select the renditions to produce for a source of the given height.
///
/// Rules:
/// 1. Only downscale, never upscale.
/// 2. A non-empty request list is filtered to valid downscales; unknown
///    names are ignored.
/// 3. An empty request auto-selects every ladder rung below the source.
///
/// The returned list is ordered highest bandwidth first. An empty result
/// means the source is already at or below the lowest rung and transcoding
/// should be skipped entirely.
pub fn select_renditions(source_height: u32, requested: &[String]) -> Vec<Resolution> {
    if requested.is_empty() {
        RESOLUTION_LADDER
            .into_iter()
            .filter(|r| r.height() < source_height)
            .collect()
    } else {
        let mut valid: Vec<Resolution> = requested
            .iter()
            .filter_map(|name| Resolution::parse(name))
            .filter(|r| r.height() < source_height)
            .collect();
        valid.sort_by(|a, b| b.bandwidth().cmp(&a.bandwidth()));
        valid.dedup();
        valid
    }
}

/// A fully assembled single-resolution rendition.
///
/// Only ever constructed once every chunk for the resolution transcoded
/// successfully; partial resolutions are dropped, never published.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RenditionVariant {
    /// Resolution of this variant
    pub resolution: Resolution,
    /// Storage key of the variant playlist
    pub playlist_key: String,
    /// Bandwidth estimate in bits/second
    pub bandwidth: u64,
    /// Number of segments referenced by the playlist
    pub segment_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(rs: &[Resolution]) -> Vec<&'static str> {
        rs.iter().map(|r| r.name()).collect()
    }

    #[test]
    fn auto_select_1080p_source() {
        let targets = select_renditions(1080, &[]);
        assert_eq!(names(&targets), vec!["720p", "480p", "320p"]);
    }

    #[test]
    fn auto_select_480p_source() {
        let targets = select_renditions(480, &[]);
        assert_eq!(names(&targets), vec!["320p"]);
    }

    #[test]
    fn requested_list_is_filtered_to_downscales() {
        let targets = select_renditions(1080, &["720p".into()]);
        assert_eq!(names(&targets), vec!["720p"]);
    }

    #[test]
    fn upscale_request_yields_empty() {
        // 480x270 source requesting 1080p: nothing to produce.
        let targets = select_renditions(270, &["1080p".into()]);
        assert!(targets.is_empty());
    }

    #[test]
    fn minimum_resolution_source_yields_empty() {
        assert!(select_renditions(320, &[]).is_empty());
        assert!(select_renditions(240, &[]).is_empty());
    }

    #[test]
    fn unknown_names_are_ignored() {
        let targets = select_renditions(1080, &["4k".into(), "480p".into(), "potato".into()]);
        assert_eq!(names(&targets), vec!["480p"]);
    }

    #[test]
    fn requested_order_is_normalized_highest_first() {
        let targets = select_renditions(1080, &["320p".into(), "720p".into(), "480p".into()]);
        assert_eq!(names(&targets), vec!["720p", "480p", "320p"]);
    }

    #[test]
    fn never_returns_resolution_at_or_above_source() {
        for source_height in [1, 240, 320, 321, 480, 719, 720, 1080, 2160] {
            for r in select_renditions(source_height, &[]) {
                assert!(r.height() < source_height);
            }
        }
    }

    #[test]
    fn resolution_serde_uses_ladder_names() {
        let json = serde_json::to_string(&Resolution::P720).expect("serialize");
        assert_eq!(json, "\"720p\"");
        let parsed: Resolution = serde_json::from_str("\"320p\"").expect("deserialize");
        assert_eq!(parsed, Resolution::P320);
    }
}
