//! Per-platform selector configuration and the compiled-in catalog.
//!
//! A [`PlatformConfig`] describes where posts live on one site (the root
//! selector) and which media containers inside a post carry descriptive text.
//! The catalog is resolved once per page by hostname; an unsupported host
//! simply resolves to `None` and the engine never starts.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Selector configuration for one supported site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub name: String,
    /// Hostname fragments; the page matches when its hostname contains any.
    pub hostnames: Vec<String>,
    /// Selector for one post/item, the unit of mutation scanning.
    pub root: String,
    /// Media targets, evaluated in order.
    pub targets: Vec<TargetConfig>,
}

impl PlatformConfig {
    /// Whether this platform serves the given hostname.
    pub fn matches_host(&self, hostname: &str) -> bool {
        self.hostnames.iter().any(|h| hostname.contains(h.as_str()))
    }

    /// Attributes whose changes can make a container's text appear: every
    /// attribute a target reads, plus backfill cache attributes.
    pub fn watched_attributes(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let read = self.targets.iter().filter_map(|t| match &t.source {
            TextSource::Attribute(name) => Some(name),
            TextSource::RenderedText => None,
        });
        let cached = self
            .targets
            .iter()
            .filter_map(|t| t.backfill.as_ref().map(|b| &b.cache_attribute));
        for name in read.chain(cached) {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }
}

/// One kind of media container on a platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Element the overlay button is appended to.
    pub container_selector: String,
    /// Descendant holding the text. Empty means the container itself.
    #[serde(default)]
    pub text_selector: String,
    pub source: TextSource,
    pub anchor: Anchor,
    /// Remote lookup for containers whose DOM carries no text.
    #[serde(default)]
    pub backfill: Option<BackfillRule>,
}

/// Where the descriptive text is read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    /// Value of the named attribute (`alt`, `aria-label`, ...).
    Attribute(String),
    /// Displayed text content of the element.
    RenderedText,
}

impl TextSource {
    pub fn attribute(name: &str) -> Self {
        Self::Attribute(name.to_string())
    }
}

/// Button anchor offsets in pixels, measured from the container edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    #[serde(default)]
    pub top: Option<f64>,
    #[serde(default)]
    pub bottom: Option<f64>,
    #[serde(default)]
    pub left: Option<f64>,
    #[serde(default)]
    pub right: Option<f64>,
}

/// Edge an anchor coordinate is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

impl Edge {
    /// CSS property name for this edge.
    pub fn css_property(self) -> &'static str {
        match self {
            Edge::Top => "top",
            Edge::Bottom => "bottom",
            Edge::Left => "left",
            Edge::Right => "right",
        }
    }
}

impl Anchor {
    pub const fn top_left(top: f64, left: f64) -> Self {
        Self { top: Some(top), bottom: None, left: Some(left), right: None }
    }

    pub const fn bottom_left(bottom: f64, left: f64) -> Self {
        Self { top: None, bottom: Some(bottom), left: Some(left), right: None }
    }

    pub const fn bottom_right(bottom: f64, right: f64) -> Self {
        Self { top: None, bottom: Some(bottom), left: None, right: Some(right) }
    }

    /// Declared coordinates in `top, bottom, left, right` order.
    pub fn edges(&self) -> impl Iterator<Item = (Edge, f64)> + '_ {
        [
            (Edge::Top, self.top),
            (Edge::Bottom, self.bottom),
            (Edge::Left, self.left),
            (Edge::Right, self.right),
        ]
        .into_iter()
        .filter_map(|(edge, v)| v.map(|v| (edge, v)))
    }

    /// Tooltips left-align with buttons anchored from the left edge and
    /// right-align otherwise.
    pub fn is_left_anchored(&self) -> bool {
        self.left.is_some()
    }
}

/// Remote lookup rule for media whose alternate text is not in the DOM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackfillRule {
    /// Containers without a matching media element are ignored.
    pub media_selector: String,
    /// Ancestor of the container that carries the post identifier.
    pub post_ancestor_selector: String,
    /// Attribute on that ancestor holding the post URI.
    pub post_id_attribute: String,
    /// Attribute on the container where a fetched text is cached.
    pub cache_attribute: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Catalog
// ─────────────────────────────────────────────────────────────────────────────

fn target(
    container_selector: &str,
    text_selector: &str,
    source: TextSource,
    anchor: Anchor,
) -> TargetConfig {
    TargetConfig {
        container_selector: container_selector.to_string(),
        text_selector: text_selector.to_string(),
        source,
        anchor,
        backfill: None,
    }
}

fn platform(name: &str, hostnames: &[&str], root: &str, targets: Vec<TargetConfig>) -> PlatformConfig {
    PlatformConfig {
        name: name.to_string(),
        hostnames: hostnames.iter().map(|h| h.to_string()).collect(),
        root: root.to_string(),
        targets,
    }
}

fn build_catalog() -> Vec<PlatformConfig> {
    let twitter = platform(
        "Twitter/X",
        &["twitter.com", "x.com"],
        r#"article[data-testid="tweet"]"#,
        vec![
            target(
                r#"div[data-testid="tweetPhoto"][aria-label]"#,
                "",
                TextSource::attribute("aria-label"),
                Anchor::top_left(10.0, 12.0),
            ),
            target(
                r#"div[data-testid="tweetPhoto"]:has(video[aria-label])"#,
                "video[aria-label]",
                TextSource::attribute("aria-label"),
                Anchor::top_left(10.0, 12.0),
            ),
        ],
    );

    let bluesky = platform(
        "Bluesky",
        &["bsky.app"],
        r#"div[data-testid*="-by-"], div[role="link"]:has(div[data-testid="userAvatarImage"])"#,
        vec![
            // data-expoimage excludes avatars
            target(
                "div[data-expoimage]:has(img[alt])",
                "img[alt]",
                TextSource::attribute("alt"),
                Anchor::bottom_left(10.0, 10.0),
            ),
            // GIF stickers
            target(
                "div:has(> video[aria-label])",
                "video[aria-label]",
                TextSource::attribute("aria-label"),
                Anchor::bottom_left(10.0, 10.0),
            ),
            target(
                "div[aria-label]:has(video):has(figcaption)",
                "figcaption",
                TextSource::RenderedText,
                Anchor::bottom_left(60.0, 10.0),
            ),
        ],
    );

    let mut tokimeki_video = target(
        "div.timeline-video-wrap:has(video), div.timeline-video-wrap:has(.video-player)",
        "",
        TextSource::attribute("alt"),
        Anchor::bottom_right(60.0, 10.0),
    );
    tokimeki_video.backfill = Some(BackfillRule {
        media_selector: "video, .video-player".to_string(),
        post_ancestor_selector: ".timeline__content".to_string(),
        post_id_attribute: "data-aturi".to_string(),
        cache_attribute: "alt".to_string(),
    });

    let tokimeki = platform(
        "Tokimeki",
        &["tokimeki.blue"],
        "article.timeline__item, article.notifications-item, dialog.media-content-wrap",
        vec![
            target(
                "div.timeline-image:not(.avatar div):has(img[alt])",
                "img[alt]",
                TextSource::attribute("alt"),
                Anchor::bottom_left(10.0, 10.0),
            ),
            // media detail modal
            target(
                "div.media-content__image:has(img[alt])",
                "img[alt]",
                TextSource::attribute("alt"),
                Anchor::bottom_left(10.0, 10.0),
            ),
            target(
                "div.timeline-external--tenor:has(video.gif-video)",
                "p.timeline-external__description",
                TextSource::RenderedText,
                Anchor::top_left(10.0, 10.0),
            ),
            tokimeki_video,
        ],
    );

    vec![twitter, bluesky, tokimeki]
}

static CATALOG: LazyLock<Vec<PlatformConfig>> = LazyLock::new(build_catalog);

/// All compiled-in platforms, in match priority order.
pub fn catalog() -> &'static [PlatformConfig] {
    &CATALOG
}

/// Resolve the platform for a hostname against the compiled-in catalog.
pub fn resolve(hostname: &str) -> Option<&'static PlatformConfig> {
    resolve_in(catalog(), hostname)
}

/// First platform in `platforms` whose hostname fragments match.
pub fn resolve_in<'a>(platforms: &'a [PlatformConfig], hostname: &str) -> Option<&'a PlatformConfig> {
    platforms.iter().find(|p| p.matches_host(hostname))
}
