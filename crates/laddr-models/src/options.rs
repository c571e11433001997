//! Processing options for a pipeline run.
//!
//! Every option is a named, typed, defaulted field. An empty JSON object
//! deserializes to full auto-detection.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Complete processing options for one pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ProcessingOptions {
    /// Requested rendition names (empty = auto-detect from source height)
    pub target_resolutions: Vec<String>,
    /// Thumbnail settings
    pub thumbnail: ThumbnailOptions,
    /// Watermark settings (None = no watermark)
    pub watermark: Option<WatermarkOptions>,
    /// Chapter/scene detection settings
    pub chapters: ChapterOptions,
    /// Quality preset affects encoding speed vs compression
    pub quality_preset: QualityPreset,
}

/// Thumbnail generation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ThumbnailMode {
    /// No thumbnail
    #[default]
    None,
    /// Frame at a fixed timestamp, with a fallback for short assets
    Auto,
    /// Frame at a caller-specified timestamp, clamped to the asset duration
    Custom,
    /// The most visually distinctive sampled frame
    SceneBased,
}

impl ThumbnailMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThumbnailMode::None => "none",
            ThumbnailMode::Auto => "auto",
            ThumbnailMode::Custom => "custom",
            ThumbnailMode::SceneBased => "scene_based",
        }
    }
}

impl fmt::Display for ThumbnailMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration for thumbnail generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ThumbnailOptions {
    /// Generation mode
    pub mode: ThumbnailMode,
    /// Timestamp for `custom` mode, e.g. "00:01:30"
    pub custom_timestamp: Option<String>,
    /// Storage key of a caller-uploaded image to use verbatim
    pub custom_image_key: Option<String>,
}

/// Watermark overlay position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum WatermarkPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
    Center,
}

impl WatermarkPosition {
    /// Drawtext coordinate expression for this position.
    pub fn coordinates(&self) -> &'static str {
        match self {
            WatermarkPosition::TopLeft => "x=10:y=10",
            WatermarkPosition::TopRight => "x=w-tw-10:y=10",
            WatermarkPosition::BottomLeft => "x=10:y=h-th-10",
            WatermarkPosition::BottomRight => "x=w-tw-10:y=h-th-10",
            WatermarkPosition::Center => "x=(w-tw)/2:y=(h-th)/2",
        }
    }
}

/// Configuration for watermark overlay.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct WatermarkOptions {
    /// Text to overlay
    pub text: String,
    /// Position on the frame
    pub position: WatermarkPosition,
    /// Font size in pixels
    pub font_size: u32,
    /// Background box opacity (0.0 - 1.0)
    pub opacity: f64,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            text: String::new(),
            position: WatermarkPosition::BottomRight,
            font_size: 24,
            opacity: 0.5,
        }
    }
}

/// Configuration for scene detection and chapter generation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ChapterOptions {
    /// Whether chapter detection runs at all
    pub enabled: bool,
    /// Scene change sensitivity (0.1 - 0.5, lower = more scenes)
    pub scene_threshold: f64,
    /// Minimum chapter duration in seconds
    pub min_duration: u32,
    /// Label a short first chapter as the intro
    pub detect_intro: bool,
    /// Label a short last chapter as the outro
    pub detect_outro: bool,
}

impl Default for ChapterOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            scene_threshold: 0.3,
            min_duration: 30,
            detect_intro: true,
            detect_outro: true,
        }
    }
}

/// Encoding quality preset, mapped onto the x264 preset of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    Fast,
    #[default]
    Medium,
    Slow,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Fast => "fast",
            QualityPreset::Medium => "medium",
            QualityPreset::Slow => "slow",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_means_auto_detect() {
        let opts: ProcessingOptions = serde_json::from_str("{}").expect("deserialize {}");
        assert!(opts.target_resolutions.is_empty());
        assert_eq!(opts.thumbnail.mode, ThumbnailMode::None);
        assert!(opts.watermark.is_none());
        assert!(!opts.chapters.enabled);
        assert_eq!(opts.quality_preset, QualityPreset::Medium);
    }

    #[test]
    fn chapter_defaults_match_policy() {
        let opts = ChapterOptions::default();
        assert!((opts.scene_threshold - 0.3).abs() < f64::EPSILON);
        assert_eq!(opts.min_duration, 30);
        assert!(opts.detect_intro);
        assert!(opts.detect_outro);
    }

    #[test]
    fn partial_options_fill_defaults() {
        let json = r#"{
            "target_resolutions": ["720p"],
            "thumbnail": {"mode": "scene_based"},
            "chapters": {"enabled": true, "min_duration": 45}
        }"#;
        let opts: ProcessingOptions = serde_json::from_str(json).expect("deserialize partial");
        assert_eq!(opts.target_resolutions, vec!["720p".to_string()]);
        assert_eq!(opts.thumbnail.mode, ThumbnailMode::SceneBased);
        assert!(opts.thumbnail.custom_timestamp.is_none());
        assert!(opts.chapters.enabled);
        assert_eq!(opts.chapters.min_duration, 45);
        assert!((opts.chapters.scene_threshold - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn watermark_position_serde_is_kebab_case() {
        let pos: WatermarkPosition = serde_json::from_str("\"bottom-right\"").expect("parse");
        assert_eq!(pos, WatermarkPosition::BottomRight);
    }
}
