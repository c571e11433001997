//! Scene change detection and chapter construction.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use tracing::info;

use laddr_models::{Chapter, ChapterOptions, VideoId};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Chapters at the edges at most this long get intro/outro labels.
const EDGE_CHAPTER_MAX_SECONDS: f64 = 60.0;

fn pts_time_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"pts_time:\s*([0-9.]+)").unwrap())
}

/// Run scene-change detection and return raw scene timestamps in seconds.
///
/// The select filter passes only frames whose scene score exceeds the
/// threshold; showinfo prints each surviving frame's pts_time to stderr.
pub async fn detect_scene_timestamps(
    input: impl AsRef<Path>,
    threshold: f64,
    timeout_secs: u64,
) -> MediaResult<Vec<f64>> {
    let input = input.as_ref();
    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }

    let cmd = FfmpegCommand::new(input, "-")
        .log_level("info")
        .output_args([
            "-filter:v".to_string(),
            format!("select='gt(scene,{threshold})',showinfo"),
        ])
        .output_args(["-f", "null"]);

    let output = FfmpegRunner::new()
        .with_timeout(timeout_secs)
        .run_capturing(&cmd)
        .await?;

    let timestamps = parse_scene_timestamps(&output.stderr);
    info!(scene_count = timestamps.len(), "scene detection complete");
    Ok(timestamps)
}

/// Parse pts_time values from showinfo filter output.
pub fn parse_scene_timestamps(ffmpeg_stderr: &str) -> Vec<f64> {
    pts_time_regex()
        .captures_iter(ffmpeg_stderr)
        .filter_map(|cap| cap[1].parse::<f64>().ok())
        .collect()
}

/// Build chapters from raw scene timestamps.
///
/// Boundaries closer together than `min_duration` are merged, the list
/// always spans [0, duration], and short first/last chapters get
/// intro/outro labels when enabled. A source shorter than twice the
/// minimum duration yields a single "Full Video" chapter.
pub fn build_chapters(scene_times: &[f64], duration: f64, options: &ChapterOptions) -> Vec<Chapter> {
    let min_duration = f64::from(options.min_duration);

    if duration < min_duration * 2.0 {
        return vec![Chapter {
            start: 0.0,
            end: duration,
            title: "Full Video".to_string(),
        }];
    }

    // Merge boundaries that would create too-short chapters.
    let mut merged = vec![0.0];
    for &t in scene_times.iter().chain(std::iter::once(&duration)) {
        let last = merged[merged.len() - 1];
        if t - last >= min_duration {
            merged.push(t);
        }
    }
    let last = merged[merged.len() - 1];
    if last != duration {
        if duration - last < min_duration {
            let idx = merged.len() - 1;
            merged[idx] = duration;
        } else {
            merged.push(duration);
        }
    }

    let chapter_count = merged.len() - 1;
    let mut chapters = Vec::with_capacity(chapter_count);
    for i in 0..chapter_count {
        let start = merged[i];
        let end = merged[i + 1];
        let length = end - start;

        let is_intro = options.detect_intro && i == 0 && length <= EDGE_CHAPTER_MAX_SECONDS;
        let is_outro =
            options.detect_outro && i == chapter_count - 1 && length <= EDGE_CHAPTER_MAX_SECONDS;

        let title = if is_intro {
            "Introduction".to_string()
        } else if is_outro {
            "Outro".to_string()
        } else {
            format!("Chapter {}", i + 1)
        };

        chapters.push(Chapter { start, end, title });
    }

    if chapters.is_empty() {
        chapters.push(Chapter {
            start: 0.0,
            end: duration,
            title: "Full Video".to_string(),
        });
    }

    chapters
}

/// Format seconds as a WebVTT timestamp (HH:MM:SS.mmm).
fn format_vtt_timestamp(seconds: f64) -> String {
    let h = (seconds / 3600.0) as u64;
    let m = ((seconds % 3600.0) / 60.0) as u64;
    let s = seconds % 60.0;
    format!("{h:02}:{m:02}:{s:06.3}")
}

/// Render chapters as a WebVTT file for HTML5 players.
pub fn render_webvtt(chapters: &[Chapter], video_id: &VideoId) -> String {
    let mut lines = vec!["WEBVTT".to_string(), format!("X-VIDEO-ID: {video_id}"), String::new()];

    for chapter in chapters {
        lines.push(format!(
            "{} --> {}",
            format_vtt_timestamp(chapter.start),
            format_vtt_timestamp(chapter.end)
        ));
        lines.push(chapter.title.clone());
        lines.push(String::new());
    }

    lines.join("\n")
}

#[derive(Serialize)]
struct ChapterDocument<'a> {
    video_id: &'a VideoId,
    total_duration: f64,
    chapter_count: usize,
    chapters: &'a [Chapter],
}

/// Render chapters as the machine-readable JSON document.
pub fn render_chapters_json(
    chapters: &[Chapter],
    video_id: &VideoId,
    total_duration: f64,
) -> MediaResult<String> {
    let doc = ChapterDocument {
        video_id,
        total_duration,
        chapter_count: chapters.len(),
        chapters,
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_options() -> ChapterOptions {
        ChapterOptions {
            enabled: true,
            ..ChapterOptions::default()
        }
    }

    #[test]
    fn parses_pts_time_from_showinfo_lines() {
        let stderr = "\
[Parsed_showinfo_1 @ 0x5555] n:  42 pts:  84084 pts_time:3.5035 pos: 123\n\
[Parsed_showinfo_1 @ 0x5555] n:  99 pts: 240240 pts_time:10.01 pos: 456\n\
some unrelated line\n";
        let times = parse_scene_timestamps(stderr);
        assert_eq!(times.len(), 2);
        assert!((times[0] - 3.5035).abs() < 0.0001);
        assert!((times[1] - 10.01).abs() < 0.0001);
    }

    #[test]
    fn short_video_gets_single_full_chapter() {
        let chapters = build_chapters(&[10.0, 20.0], 45.0, &default_options());
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].title, "Full Video");
        assert!((chapters[0].end - 45.0).abs() < f64::EPSILON);
    }

    #[test]
    fn close_boundaries_are_merged() {
        // Scenes at 5s and 10s are both within min_duration of their
        // predecessors and disappear; 40s survives.
        let chapters = build_chapters(&[5.0, 10.0, 40.0], 300.0, &default_options());
        assert_eq!(chapters.len(), 2);
        assert!((chapters[0].start - 0.0).abs() < f64::EPSILON);
        assert!((chapters[0].end - 40.0).abs() < f64::EPSILON);
        assert!((chapters[1].end - 300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn short_first_chapter_is_labelled_introduction() {
        let chapters = build_chapters(&[45.0, 200.0], 400.0, &default_options());
        assert_eq!(chapters[0].title, "Introduction");
        assert_eq!(chapters[1].title, "Chapter 2");
    }

    #[test]
    fn short_last_chapter_is_labelled_outro() {
        let chapters = build_chapters(&[100.0, 250.0], 290.0, &default_options());
        let last = chapters.last().unwrap();
        assert_eq!(last.title, "Outro");
    }

    #[test]
    fn edge_labels_respect_toggles() {
        let options = ChapterOptions {
            enabled: true,
            detect_intro: false,
            detect_outro: false,
            ..ChapterOptions::default()
        };
        let chapters = build_chapters(&[45.0, 200.0], 230.0, &options);
        assert_eq!(chapters[0].title, "Chapter 1");
        assert_eq!(chapters.last().unwrap().title, format!("Chapter {}", chapters.len()));
    }

    #[test]
    fn no_scenes_still_covers_full_duration() {
        let chapters = build_chapters(&[], 300.0, &default_options());
        assert_eq!(chapters.len(), 1);
        assert!((chapters[0].start - 0.0).abs() < f64::EPSILON);
        assert!((chapters[0].end - 300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn chapters_tile_the_duration_without_gaps() {
        let chapters = build_chapters(&[35.0, 90.0, 95.0, 160.0], 200.0, &default_options());
        assert!((chapters[0].start - 0.0).abs() < f64::EPSILON);
        for pair in chapters.windows(2) {
            assert!((pair[0].end - pair[1].start).abs() < f64::EPSILON);
            assert!(pair[0].duration() >= 30.0);
        }
        assert!((chapters.last().unwrap().end - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn webvtt_output_has_header_and_cues() {
        let chapters = vec![
            Chapter {
                start: 0.0,
                end: 30.0,
                title: "Introduction".to_string(),
            },
            Chapter {
                start: 30.0,
                end: 135.0,
                title: "Chapter 2".to_string(),
            },
        ];
        let vtt = render_webvtt(&chapters, &VideoId::from_string("v1"));
        assert!(vtt.starts_with("WEBVTT\nX-VIDEO-ID: v1\n"));
        assert!(vtt.contains("00:00:00.000 --> 00:00:30.000\nIntroduction"));
        assert!(vtt.contains("00:00:30.000 --> 00:02:15.000\nChapter 2"));
    }

    #[test]
    fn json_document_carries_counts() {
        let chapters = vec![Chapter {
            start: 0.0,
            end: 60.0,
            title: "Full Video".to_string(),
        }];
        let json = render_chapters_json(&chapters, &VideoId::from_string("v1"), 60.0).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["video_id"], "v1");
        assert_eq!(value["chapter_count"], 1);
        assert_eq!(value["chapters"][0]["title"], "Full Video");
    }
}
