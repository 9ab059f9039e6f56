//! Centralized text and CSS-length formatting utilities.
//!
//! All strings the engine writes into inline styles or log lines go through
//! this module so overlay geometry and log previews stay consistent between
//! the core engine and the browser binding.

/// Format a pixel length for an inline style.
///
/// Whole values are written without a fractional part, so anchors declared as
/// `10.0` come out exactly as `10px`.
///
/// # Examples
/// ```
/// use altlens_types::formatting::format_px;
/// assert_eq!(format_px(10.0), "10px");
/// assert_eq!(format_px(-2.0), "-2px");
/// assert_eq!(format_px(12.5), "12.5px");
/// ```
pub fn format_px(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}px", value as i64)
    } else {
        format!("{}px", value)
    }
}

/// Format a CSS `clamp()` expression keeping a coordinate between `min` and
/// `100% - max_inset`.
///
/// # Examples
/// ```
/// use altlens_types::formatting::format_clamp;
/// assert_eq!(
///     format_clamp(5.0, 10.0, 35.0),
///     "clamp(5px, 10px, calc(100% - 35px))"
/// );
/// ```
pub fn format_clamp(min: f64, value: f64, max_inset: f64) -> String {
    format!(
        "clamp({}, {}, calc(100% - {}))",
        format_px(min),
        format_px(value),
        format_px(max_inset)
    )
}

/// Collapse a multi-line text into a single-line preview for log output.
///
/// Newlines become spaces and the result is cut at `max_chars` characters
/// (not bytes, so CJK text is never split mid-codepoint). A trailing `...`
/// marks truncation.
///
/// # Examples
/// ```
/// use altlens_types::formatting::format_preview;
/// assert_eq!(format_preview("short", 80), "short");
/// assert_eq!(format_preview("line one\nline two", 80), "line one line two");
/// assert_eq!(format_preview("abcdefghij", 4), "abcd...");
/// ```
pub fn format_preview(text: &str, max_chars: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let truncated: String = flat.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_px() {
        assert_eq!(format_px(0.0), "0px");
        assert_eq!(format_px(5.0), "5px");
        assert_eq!(format_px(60.0), "60px");
        assert_eq!(format_px(0.5), "0.5px");
    }

    #[test]
    fn test_format_clamp() {
        assert_eq!(
            format_clamp(5.0, 60.0, 35.0),
            "clamp(5px, 60px, calc(100% - 35px))"
        );
    }

    #[test]
    fn test_format_preview_multibyte() {
        let text = "猫が帽子をかぶって窓辺に座っている";
        assert_eq!(format_preview(text, 3), "猫が帽...");
        assert_eq!(format_preview(text, 100), text);
    }

    #[test]
    fn test_format_preview_crlf() {
        assert_eq!(format_preview("a\r\nb", 80), "a  b");
    }
}
