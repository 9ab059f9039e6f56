//! Engine tuning values.
//!
//! Everything here is compiled in; the struct exists so thresholds and delays
//! are named in one place and tests can override individual fields.

use serde::{Deserialize, Serialize};

/// Generic labels platforms auto-fill when no real description was authored.
pub const PLACEHOLDER_STRINGS: &[&str] = &[
    "画像",
    "Image",
    "圖片",
    "이미지",
    "Imagen",
    "Bild",
    "Immagine",
    "Imagem",
    "Foto",
    "Rasm",
    "Kép",
    "zdjęcie",
    "埋め込み動画",
    "埋め込みビデオプレーヤー",
];

/// Public read endpoint used for video alt text backfill.
pub const DEFAULT_THREAD_ENDPOINT: &str =
    "https://public.api.bsky.app/xrpc/app.bsky.feed.getPostThread";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    /// Text must be strictly longer than this many characters after trimming.
    pub min_text_chars: usize,
    /// Containers narrower than this are treated as icons and skipped.
    pub min_container_width: f64,
    /// Delay after page load before the catch-up scan.
    pub settle_delay_ms: u32,
    /// How long the tooltip lingers after the pointer leaves.
    pub hide_grace_ms: u32,
    /// How long the copy confirmation icon stays up.
    pub copy_feedback_ms: u32,
    pub placeholders: Vec<String>,
    pub thread_endpoint: String,
    /// `depth` query parameter sent with thread lookups.
    pub thread_depth: u32,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            min_text_chars: 12,
            min_container_width: 40.0,
            settle_delay_ms: 1000,
            hide_grace_ms: 200,
            copy_feedback_ms: 1500,
            placeholders: PLACEHOLDER_STRINGS.iter().map(|s| s.to_string()).collect(),
            thread_endpoint: DEFAULT_THREAD_ENDPOINT.to_string(),
            thread_depth: 0,
        }
    }
}

impl ViewerSettings {
    pub fn is_placeholder(&self, text: &str) -> bool {
        self.placeholders.iter().any(|p| p == text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_override_keeps_defaults() {
        let settings: ViewerSettings = toml::from_str("hide_grace_ms = 50").unwrap();
        assert_eq!(settings.hide_grace_ms, 50);
        assert_eq!(settings.min_text_chars, 12);
        assert!(settings.is_placeholder("画像"));
        assert!(!settings.is_placeholder("画像 "));
    }
}
