//! Remote alt text backfill.
//!
//! Some media (Tokimeki videos) render without any alt text in the DOM. The
//! text is recovered from the public post thread API using the post URI
//! carried by an ancestor node.
//!
//! Per container the resolver runs a small state machine kept in a
//! side-table keyed by node identity:
//!
//! ```text
//!   Idle ──try_begin──▶ Fetching ──valid text──▶ Resolved
//!    ▲                     │
//!    └───── failure ───────┘
//! ```
//!
//! Entry to `Fetching` is exclusive, so overlapping processing passes for the
//! same container issue one request. A failure returns to `Idle`; the next
//! mutation touching the post retries.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use altlens_types::{BackfillRule, ViewerSettings};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::dom::{Document, NodeKey};
use crate::error::ResolveError;
use crate::runtime::LocalBoxFuture;
use crate::text;

// ─────────────────────────────────────────────────────────────────────────────
// Response Model
// ─────────────────────────────────────────────────────────────────────────────

/// The subset of `app.bsky.feed.getPostThread` the resolver reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadResponse {
    #[serde(default)]
    pub thread: Option<ThreadNode>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadNode {
    #[serde(default)]
    pub post: Option<PostView>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostView {
    #[serde(default)]
    pub embed: Option<EmbedView>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmbedView {
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub video: Option<AltView>,
    #[serde(default)]
    pub media: Option<MediaView>,
    #[serde(default)]
    pub external: Option<ExternalView>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AltView {
    #[serde(default)]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaView {
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub external: Option<ExternalView>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalView {
    #[serde(default)]
    pub title: Option<String>,
}

impl ThreadResponse {
    /// First non-empty alt-like field, video alt first, embed titles last.
    pub fn alt_text(&self) -> Option<&str> {
        let embed = self.thread.as_ref()?.post.as_ref()?.embed.as_ref()?;
        let media = embed.media.as_ref();
        [
            embed.video.as_ref().and_then(|v| v.alt.as_deref()),
            embed.alt.as_deref(),
            media.and_then(|m| m.alt.as_deref()),
            embed.external.as_ref().and_then(|e| e.title.as_deref()),
            media
                .and_then(|m| m.external.as_ref())
                .and_then(|e| e.title.as_deref()),
        ]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Thread Sources
// ─────────────────────────────────────────────────────────────────────────────

/// Anything that can look up a post thread by URI.
pub trait ThreadSource: 'static {
    fn fetch_thread(&self, post_uri: &str) -> LocalBoxFuture<Result<ThreadResponse, ResolveError>>;
}

/// Client for the public Bluesky AppView.
#[derive(Debug, Clone)]
pub struct BskyThreadClient {
    client: reqwest::Client,
    endpoint: String,
    depth: u32,
}

impl BskyThreadClient {
    pub fn new(settings: &ViewerSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: settings.thread_endpoint.clone(),
            depth: settings.thread_depth,
        }
    }
}

impl ThreadSource for BskyThreadClient {
    fn fetch_thread(&self, post_uri: &str) -> LocalBoxFuture<Result<ThreadResponse, ResolveError>> {
        let request = self
            .client
            .get(&self.endpoint)
            .query(&[("uri", post_uri.to_string()), ("depth", self.depth.to_string())]);

        Box::pin(async move {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(ResolveError::Status(status.as_u16()));
            }
            response
                .json::<ThreadResponse>()
                .await
                .map_err(|e| ResolveError::Malformed(e.to_string()))
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolver
// ─────────────────────────────────────────────────────────────────────────────

/// Backfill state of one container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FetchState {
    #[default]
    Idle,
    Fetching,
    Resolved(String),
}

pub struct RemoteAltResolver<S> {
    source: S,
    settings: Rc<ViewerSettings>,
    states: RefCell<HashMap<NodeKey, FetchState>>,
}

impl<S: ThreadSource> RemoteAltResolver<S> {
    pub fn new(source: S, settings: Rc<ViewerSettings>) -> Self {
        Self {
            source,
            settings,
            states: RefCell::new(HashMap::new()),
        }
    }

    pub fn state(&self, key: NodeKey) -> FetchState {
        self.states.borrow().get(&key).cloned().unwrap_or_default()
    }

    /// Move `key` into `Fetching` if it is idle. Returns false when a fetch is
    /// already outstanding or the text is already resolved.
    pub fn try_begin(&self, key: NodeKey) -> bool {
        let mut states = self.states.borrow_mut();
        let state = states.entry(key).or_default();
        if *state != FetchState::Idle {
            return false;
        }
        *state = FetchState::Fetching;
        true
    }

    /// Record the outcome of a fetch and return the usable text, or an empty
    /// string when the container should stay without an overlay.
    pub fn complete(&self, key: NodeKey, outcome: Result<String, ResolveError>) -> String {
        let resolved = match outcome {
            Ok(alt) if text::is_valid(&alt, &self.settings) => Some(alt),
            Ok(alt) => {
                debug!(key, len = alt.chars().count(), "Fetched alt text rejected as invalid");
                None
            }
            Err(e) => {
                warn!(key, error = %e, "Alt text backfill failed");
                None
            }
        };

        let mut states = self.states.borrow_mut();
        match resolved {
            Some(alt) => {
                states.insert(key, FetchState::Resolved(alt.clone()));
                alt
            }
            None => {
                states.insert(key, FetchState::Idle);
                String::new()
            }
        }
    }

    /// Start a backfill for `container`.
    ///
    /// Returns `None` without side effects when the container is not idle.
    /// Otherwise the request has been issued and the returned future yields
    /// the resolved text (empty on failure). A valid text is also written to
    /// the rule's cache attribute on the container.
    pub fn begin<D: Document>(
        self: &Rc<Self>,
        dom: &Rc<D>,
        container: &D::Node,
        rule: &BackfillRule,
    ) -> Option<LocalBoxFuture<String>> {
        let key = dom.key(container);
        if !self.try_begin(key) {
            debug!(key, "Backfill already in progress or resolved, deferring");
            return None;
        }

        let post_uri = dom
            .closest(container, &rule.post_ancestor_selector)
            .and_then(|post| dom.attribute(&post, &rule.post_id_attribute))
            .filter(|uri| !uri.is_empty());
        let pending = post_uri.map(|uri| {
            debug!(key, uri = %uri, "Fetching alt text for post");
            self.source.fetch_thread(&uri)
        });

        let this = Rc::clone(self);
        let dom = Rc::clone(dom);
        let container = container.clone();
        let cache_attribute = rule.cache_attribute.clone();
        Some(Box::pin(async move {
            let outcome = match pending {
                Some(request) => request.await.and_then(|response| {
                    response
                        .alt_text()
                        .map(str::to_string)
                        .ok_or(ResolveError::NoAltText)
                }),
                None => Err(ResolveError::MissingPostId),
            };
            let alt = this.complete(key, outcome);
            if !alt.is_empty() {
                if !dom.is_connected(&container) {
                    debug!(key, "Container detached before backfill completed");
                }
                dom.set_attribute(&container, &cache_attribute, &alt);
            }
            alt
        }))
    }

    /// Drop settled side-table entries `keep` rejects. Outstanding fetches
    /// are always kept so their exclusivity holds until they complete.
    pub fn retain(&self, mut keep: impl FnMut(NodeKey) -> bool) {
        self.states
            .borrow_mut()
            .retain(|key, state| *state == FetchState::Fetching || keep(*key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ThreadResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_alt_text_priority_prefers_video_alt() {
        let response = parse(
            r#"{"thread":{"post":{"embed":{
                "alt":"embed alt",
                "video":{"alt":"video alt"},
                "external":{"title":"external title"}
            }}}}"#,
        );
        assert_eq!(response.alt_text(), Some("video alt"));
    }

    #[test]
    fn test_alt_text_falls_through_empty_fields() {
        let response = parse(
            r#"{"thread":{"post":{"embed":{
                "alt":"",
                "media":{"alt":"","external":{"title":"A tenor gif of a dancing cat"}}
            }}}}"#,
        );
        assert_eq!(response.alt_text(), Some("A tenor gif of a dancing cat"));
    }

    #[test]
    fn test_alt_text_ignores_unknown_fields() {
        let response = parse(
            r#"{"thread":{"$type":"app.bsky.feed.defs#threadViewPost","post":{
                "uri":"at://did:plc:abc/app.bsky.feed.post/1",
                "embed":{"$type":"app.bsky.embed.video#view","alt":"A slow pan over a harbor at dusk","cid":"x"}
            }}}"#,
        );
        assert_eq!(response.alt_text(), Some("A slow pan over a harbor at dusk"));
    }

    #[test]
    fn test_alt_text_absent() {
        assert_eq!(parse("{}").alt_text(), None);
        assert_eq!(parse(r#"{"thread":{"post":{}}}"#).alt_text(), None);
    }

    #[test]
    fn test_wrong_field_type_is_malformed() {
        let parsed: Result<ThreadResponse, _> =
            serde_json::from_str(r#"{"thread":{"post":{"embed":{"alt":7}}}}"#);
        assert!(parsed.is_err());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Fetch state
    // ─────────────────────────────────────────────────────────────────────────

    struct Offline;

    impl ThreadSource for Offline {
        fn fetch_thread(&self, _post_uri: &str) -> LocalBoxFuture<Result<ThreadResponse, ResolveError>> {
            Box::pin(std::future::ready(Err(ResolveError::Source("offline".to_string()))))
        }
    }

    fn resolver() -> RemoteAltResolver<Offline> {
        RemoteAltResolver::new(Offline, Rc::new(ViewerSettings::default()))
    }

    #[test]
    fn test_try_begin_is_exclusive() {
        let resolver = resolver();
        assert!(resolver.try_begin(1));
        assert!(!resolver.try_begin(1));
        assert_eq!(resolver.state(1), FetchState::Fetching);
        // other containers are independent
        assert!(resolver.try_begin(2));
    }

    #[test]
    fn test_complete_valid_text_resolves() {
        let resolver = resolver();
        resolver.try_begin(1);
        let alt = resolver.complete(1, Ok("A slow pan over a harbor at dusk".to_string()));
        assert_eq!(alt, "A slow pan over a harbor at dusk");
        assert_eq!(resolver.state(1), FetchState::Resolved(alt));
        assert!(!resolver.try_begin(1));
    }

    #[test]
    fn test_complete_failure_and_placeholder_reset_to_idle() {
        let resolver = resolver();
        resolver.try_begin(1);
        assert_eq!(resolver.complete(1, Err(ResolveError::Status(502))), "");
        assert_eq!(resolver.state(1), FetchState::Idle);

        resolver.try_begin(1);
        assert_eq!(resolver.complete(1, Ok("埋め込み動画".to_string())), "");
        assert_eq!(resolver.state(1), FetchState::Idle);
        assert!(resolver.try_begin(1));
    }

    #[test]
    fn test_retain_keeps_outstanding_fetches() {
        let resolver = resolver();
        resolver.try_begin(1);
        resolver.try_begin(2);
        resolver.complete(2, Ok("A fox crossing a snowy road".to_string()));
        resolver.retain(|_| false);
        assert_eq!(resolver.state(1), FetchState::Fetching);
        assert_eq!(resolver.state(2), FetchState::Idle);
    }
}
