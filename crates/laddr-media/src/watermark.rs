//! Drawtext watermark filter construction.

use laddr_models::WatermarkOptions;

/// Escape text for the FFmpeg drawtext filter.
///
/// Drawtext has its own escaping rules on top of shell quoting: backslashes
/// double, single quotes close-escape-reopen, colons and percent signs take
/// a backslash. Newlines and tabs are flattened to spaces first.
pub fn escape_drawtext(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let flattened: String = text
        .chars()
        .filter(|c| *c != '\r')
        .map(|c| if c == '\n' || c == '\t' { ' ' } else { c })
        .collect();

    let mut escaped = String::with_capacity(flattened.len());
    for c in flattened.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("'\\''"),
            ':' => escaped.push_str("\\:"),
            '%' => escaped.push_str("\\%"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Build the drawtext filter string for a watermark overlay.
///
/// box=1 draws a background box; boxcolor alpha gives semi-transparency.
pub fn build_watermark_filter(options: &WatermarkOptions) -> String {
    let escaped = escape_drawtext(options.text.trim());
    format!(
        "drawtext=text='{escaped}':fontcolor=white:fontsize={}:box=1:boxcolor=black@{}:boxborderw=5:{}",
        options.font_size,
        options.opacity,
        options.position.coordinates(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use laddr_models::WatermarkPosition;

    #[test]
    fn escapes_drawtext_special_characters() {
        assert_eq!(escape_drawtext("a:b"), "a\\:b");
        assert_eq!(escape_drawtext("100%"), "100\\%");
        assert_eq!(escape_drawtext("back\\slash"), "back\\\\slash");
        assert_eq!(escape_drawtext("it's"), "it'\\''s");
        assert_eq!(escape_drawtext("line\nbreak\ttab"), "line break tab");
        assert_eq!(escape_drawtext(""), "");
    }

    #[test]
    fn filter_includes_position_and_styling() {
        let options = WatermarkOptions {
            text: "© Acme".to_string(),
            position: WatermarkPosition::BottomRight,
            font_size: 24,
            opacity: 0.5,
        };
        let filter = build_watermark_filter(&options);
        assert!(filter.starts_with("drawtext=text='© Acme':"));
        assert!(filter.contains("fontsize=24"));
        assert!(filter.contains("boxcolor=black@0.5"));
        assert!(filter.ends_with("x=w-tw-10:y=h-th-10"));
    }

    #[test]
    fn center_position_uses_midpoint_expressions() {
        let options = WatermarkOptions {
            text: "demo".to_string(),
            position: WatermarkPosition::Center,
            ..WatermarkOptions::default()
        };
        let filter = build_watermark_filter(&options);
        assert!(filter.ends_with("x=(w-tw)/2:y=(h-th)/2"));
    }
}
