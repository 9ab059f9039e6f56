//! Alt text extraction and validity filtering.

use std::sync::LazyLock;

use altlens_types::{TextSource, ViewerSettings};
use regex::Regex;

use crate::dom::Document;

/// Boilerplate stripped from extracted text, applied in order.
static NOISE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // leading "Alt:" label some authors type by hand
        r"(?i)^Alt:\s*",
        // image generator prompt header pasted verbatim
        r"(?i)^//Character\n1girl,\nBREAK\n//Fashions\n",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Strip noise and surrounding whitespace from raw text.
///
/// Each pattern removes at most its first match.
pub fn sanitize(raw: &str) -> String {
    let mut text = raw.to_string();
    for pattern in NOISE_PATTERNS.iter() {
        if let std::borrow::Cow::Owned(replaced) = pattern.replace(&text, "") {
            text = replaced;
        }
    }
    text.trim().to_string()
}

/// Read and sanitize the text carried by `element`.
///
/// Missing attributes read as empty.
pub fn extract<D: Document>(dom: &D, element: &D::Node, source: &TextSource) -> String {
    let raw = match source {
        TextSource::RenderedText => dom.rendered_text(element),
        TextSource::Attribute(name) => dom.attribute(element, name).unwrap_or_default(),
    };
    sanitize(&raw)
}

/// Whether `text` is a real description rather than a placeholder.
pub fn is_valid(text: &str, settings: &ViewerSettings) -> bool {
    let trimmed = text.trim();
    trimmed.chars().count() > settings.min_text_chars && !settings.is_placeholder(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_alt_label() {
        assert_eq!(sanitize("Alt: Foo bar"), "Foo bar");
        assert_eq!(sanitize("ALT:Foo bar"), "Foo bar");
        assert_eq!(sanitize("  alt:   Foo bar  "), "alt:   Foo bar");
    }

    #[test]
    fn test_sanitize_only_leading_label() {
        assert_eq!(sanitize("Alt: Alt: twice"), "Alt: twice");
        assert_eq!(sanitize("The Alt: key"), "The Alt: key");
    }

    #[test]
    fn test_sanitize_prompt_header() {
        let raw = "//Character\n1girl,\nBREAK\n//Fashions\nred coat, scarf, snowy street";
        assert_eq!(sanitize(raw), "red coat, scarf, snowy street");
    }

    #[test]
    fn test_sanitize_trims() {
        assert_eq!(sanitize("\n  A dog on a beach \t"), "A dog on a beach");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn test_validity_length_boundary() {
        let settings = ViewerSettings::default();
        assert!(!is_valid("", &settings));
        assert!(!is_valid("exactly12chr", &settings));
        assert!(!is_valid("   exactly12chr   ", &settings));
        assert!(is_valid("thirteen char", &settings));
    }

    #[test]
    fn test_validity_counts_chars_not_bytes() {
        let settings = ViewerSettings::default();
        // 12 characters, 36 bytes
        assert!(!is_valid("猫が帽子をかぶって窓辺に", &settings));
        assert!(is_valid("猫が帽子をかぶって窓辺に座", &settings));
    }

    #[test]
    fn test_validity_rejects_placeholders() {
        let mut settings = ViewerSettings::default();
        assert!(!is_valid("画像", &settings));
        assert!(!is_valid(" 埋め込みビデオプレーヤー ", &settings));
        // a long placeholder is still a placeholder
        settings.placeholders.push("Embedded video player".to_string());
        assert!(!is_valid("Embedded video player", &settings));
    }
}
