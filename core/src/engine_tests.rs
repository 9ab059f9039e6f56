//! End-to-end tests for the engine
//!
//! Drives the observer with synthetic mutation batches and pointer events
//! against the in-memory document, on a paused tokio clock.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use altlens_types::{PlatformConfig, TargetConfig, ViewerSettings};
use tokio::task::LocalSet;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

use crate::dom::memory::{MemNode, MemoryDocument};
use crate::dom::{Document, Mutation};
use crate::error::ResolveError;
use crate::observer::DomObserver;
use crate::overlay::{HoverTarget, Icon, Point, RELATIVE_CLASS, Rect, Size, TooltipHost};
use crate::resolver::{FetchState, ThreadResponse, ThreadSource};
use crate::runtime::{LocalBoxFuture, TokioRuntime};

const POST_URI: &str = "at://did:plc:4hqjfn7m6n5hno3doamuhgef/app.bsky.feed.post/3lcz4xq2wbk2c";

const VIDEO_THREAD: &str = r#"{"thread":{"post":{"embed":{
    "$type":"app.bsky.embed.video#view",
    "alt":"A slow pan over a harbor at dusk"
}}}}"#;

// ─────────────────────────────────────────────────────────────────────────────
// Harness
// ─────────────────────────────────────────────────────────────────────────────

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

enum Reply {
    Json(&'static str),
    Status(u16),
}

/// Thread source answering from a queue of canned replies.
#[derive(Clone, Default)]
struct ScriptedSource {
    calls: Rc<RefCell<Vec<String>>>,
    replies: Rc<RefCell<VecDeque<Reply>>>,
}

impl ScriptedSource {
    fn reply(&self, reply: Reply) {
        self.replies.borrow_mut().push_back(reply);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl ThreadSource for ScriptedSource {
    fn fetch_thread(&self, post_uri: &str) -> LocalBoxFuture<Result<ThreadResponse, ResolveError>> {
        self.calls.borrow_mut().push(post_uri.to_string());
        let reply = self.replies.borrow_mut().pop_front();
        Box::pin(async move {
            // network round trip
            sleep(Duration::from_millis(50)).await;
            match reply {
                Some(Reply::Json(body)) => {
                    serde_json::from_str(body).map_err(|e| ResolveError::Malformed(e.to_string()))
                }
                Some(Reply::Status(code)) => Err(ResolveError::Status(code)),
                None => Err(ResolveError::Source("no scripted reply".to_string())),
            }
        })
    }
}

struct Harness {
    doc: Rc<MemoryDocument>,
    source: ScriptedSource,
    observer: Rc<DomObserver<MemoryDocument, ScriptedSource, TokioRuntime>>,
}

impl Harness {
    fn new(platform: PlatformConfig) -> Self {
        init_logging();
        let doc = Rc::new(MemoryDocument::new());
        doc.set_tooltip_size(Size::new(100.0, 40.0));
        let source = ScriptedSource::default();
        let observer = crate::start_with(
            Rc::clone(&doc),
            Rc::new(TokioRuntime),
            source.clone(),
            platform,
            ViewerSettings::default(),
        );
        Self {
            doc,
            source,
            observer,
        }
    }

    fn twitter() -> Self {
        Self::new(altlens_types::resolve("x.com").unwrap().clone())
    }

    /// Tokimeki with the video target's `:has()` container selector reduced
    /// to what the in-memory document understands.
    fn tokimeki_video() -> Self {
        let tokimeki = altlens_types::resolve("tokimeki.blue").unwrap();
        let video = tokimeki.targets.last().unwrap().clone();
        Self::new(PlatformConfig {
            targets: vec![TargetConfig {
                container_selector: "div.timeline-video-wrap".to_string(),
                ..video
            }],
            ..tokimeki.clone()
        })
    }

    fn fetch_state(&self, container: MemNode) -> FetchState {
        self.observer
            .processor()
            .resolver()
            .state(self.doc.key(&container))
    }

    fn touch(&self, node: MemNode) {
        self.doc.emit(vec![Mutation::new(node, vec![])]);
    }
}

/// Detached tweet with one photo; returns (article, photo).
fn tweet(doc: &MemoryDocument, label: &str) -> (MemNode, MemNode) {
    let article = doc.create("article", &[("data-testid", "tweet")]);
    let photo = doc.add(
        article,
        "div",
        &[("data-testid", "tweetPhoto"), ("aria-label", label)],
    );
    doc.set_rect(photo, Rect::new(100.0, 200.0, 500.0, 280.0));
    (article, photo)
}

/// Detached Tokimeki post with a video; returns (article, video wrap).
fn video_post(doc: &MemoryDocument, uri: Option<&str>) -> (MemNode, MemNode) {
    let article = doc.create("article.timeline__item", &[]);
    let attrs: Vec<(&str, &str)> = uri.map(|u| vec![("data-aturi", u)]).unwrap_or_default();
    let content = doc.add(article, "div.timeline__content", &attrs);
    let wrap = doc.add(content, "div.timeline-video-wrap", &[]);
    doc.set_rect(wrap, Rect::new(0.0, 0.0, 480.0, 270.0));
    doc.add(wrap, "video", &[]);
    (article, wrap)
}

/// Let spawned tasks and short timers run.
async fn settle() {
    sleep(Duration::from_millis(100)).await;
}

// ─────────────────────────────────────────────────────────────────────────────
// Discovery and extraction
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_unsupported_host_stays_inert() {
    let doc = Rc::new(MemoryDocument::new());
    let observer = crate::start(
        doc,
        Rc::new(TokioRuntime),
        ScriptedSource::default(),
        "example.org",
        ViewerSettings::default(),
    );
    assert!(observer.is_none());
}

#[test]
fn test_aria_label_creates_overlay() {
    let h = Harness::twitter();
    let (article, photo) = tweet(&h.doc, "Alt: A cat wearing a hat sitting on a windowsill");
    h.doc.insert_and_emit(h.doc.body(), article);

    let overlay = h.doc.overlay_for(photo).expect("overlay attached");
    assert_eq!(overlay.text, "A cat wearing a hat sitting on a windowsill");
    assert_eq!(overlay.host, TooltipHost::Body);
    assert_eq!(overlay.button_style[0].1, "clamp(5px, 10px, calc(100% - 35px))");
    assert!(!overlay.button_visible);
    assert!(!overlay.tooltip_visible);
    assert!(h.doc.has_class(photo, RELATIVE_CLASS));
}

#[test]
fn test_placeholder_gets_no_overlay() {
    let h = Harness::twitter();
    let (article, _) = tweet(&h.doc, "画像");
    h.doc.insert_and_emit(h.doc.body(), article);
    assert!(h.doc.overlays().is_empty());
}

#[test]
fn test_short_text_gets_no_overlay() {
    let h = Harness::twitter();
    let (article, _) = tweet(&h.doc, "Alt: sunset");
    h.doc.insert_and_emit(h.doc.body(), article);
    assert!(h.doc.overlays().is_empty());
}

#[test]
fn test_repeated_processing_yields_one_overlay() {
    let h = Harness::twitter();
    let (article, photo) = tweet(&h.doc, "Two dogs sharing a single stick");
    h.doc.insert_and_emit(h.doc.body(), article);
    h.touch(photo);
    h.touch(article);
    h.observer.scan_all();

    assert_eq!(h.doc.overlays().len(), 1);
    assert_eq!(h.observer.processor().overlays().len(), 1);
}

#[test]
fn test_icon_sized_container_skipped() {
    let h = Harness::twitter();
    let (article, photo) = tweet(&h.doc, "A tiny verified badge icon");
    h.doc.set_rect(photo, Rect::new(0.0, 0.0, 24.0, 24.0));
    h.doc.insert_and_emit(h.doc.body(), article);
    assert!(h.doc.overlays().is_empty());

    // width 0 means not laid out yet, which is accepted
    let (article, photo) = tweet(&h.doc, "A photo still waiting for layout");
    h.doc.set_rect(photo, Rect::default());
    h.doc.insert_and_emit(h.doc.body(), article);
    assert!(h.doc.overlay_for(photo).is_some());
}

#[test]
fn test_roots_found_inside_inserted_wrappers() {
    let h = Harness::twitter();
    let wrapper = h.doc.create("div", &[]);
    let (article, photo) = tweet(&h.doc, "Rain on a tram window at night");
    h.doc.append(wrapper, article);
    let text = h.doc.create_text("loading");
    h.doc.append(h.doc.body(), wrapper);
    h.doc.append(h.doc.body(), text);
    h.doc.emit(vec![Mutation::new(h.doc.body(), vec![text, wrapper])]);

    assert!(h.doc.overlay_for(photo).is_some());
}

#[test]
fn test_late_media_inside_existing_root() {
    let h = Harness::twitter();
    let article = h.doc.create("article", &[("data-testid", "tweet")]);
    h.doc.insert_and_emit(h.doc.body(), article);
    assert!(h.doc.overlays().is_empty());

    let photo = h.doc.add(article, "div", &[("data-testid", "tweetPhoto")]);
    h.doc.emit(vec![Mutation::new(article, vec![photo])]);
    assert!(h.doc.overlays().is_empty());

    // the page fills in the label on the existing node
    assert!(h.doc.watched_attributes().contains(&"aria-label".to_string()));
    h.doc.set_attribute(&photo, "aria-label", "A lighthouse in heavy fog");
    h.doc.flush();
    assert_eq!(
        h.doc.overlay_for(photo).map(|o| o.text),
        Some("A lighthouse in heavy fog".to_string())
    );
}

#[test]
fn test_button_removed_by_rerender_is_replaced_once() {
    let h = Harness::twitter();
    let (article, photo) = tweet(&h.doc, "Wet cobblestones after a storm");
    h.doc.insert_and_emit(h.doc.body(), article);
    let first = h.doc.button_of(photo).unwrap();

    // the page re-renders the container's children and drops our button
    h.doc.remove(first);
    h.touch(photo);

    assert_eq!(h.doc.overlays().len(), 1);
    assert_eq!(h.observer.processor().overlays().len(), 1);
    let second = h.doc.button_of(photo).unwrap();
    assert_ne!(first, second);
    assert_eq!(h.doc.query_all(&photo, ".alt-button"), vec![second]);

    // stable again once the new button is in place
    h.touch(photo);
    assert_eq!(h.doc.button_of(photo), Some(second));
}

#[tokio::test(start_paused = true)]
async fn test_settle_scan_covers_content_rendered_before_observation() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::twitter();
            let (article, photo) = tweet(&h.doc, "A bowl of ramen with a soft egg");
            h.doc.append(h.doc.body(), article);

            h.doc.fire_load();
            sleep(Duration::from_millis(500)).await;
            assert!(h.doc.overlays().is_empty());

            sleep(Duration::from_millis(600)).await;
            assert!(h.doc.overlay_for(photo).is_some());
        })
        .await;
}

#[test]
fn test_detached_container_is_pruned() {
    let h = Harness::twitter();
    let (article, photo) = tweet(&h.doc, "A fox crossing a snowy road");
    h.doc.insert_and_emit(h.doc.body(), article);
    assert!(h.doc.overlay_for(photo).is_some());

    h.doc.remove(article);
    h.doc.emit(vec![Mutation::new(h.doc.body(), vec![])]);
    assert!(h.doc.overlays().is_empty());
    assert!(h.observer.processor().overlays().is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Remote backfill
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_rapid_mutations_issue_one_fetch() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::tokimeki_video();
            h.source.reply(Reply::Json(VIDEO_THREAD));
            let (article, wrap) = video_post(&h.doc, Some(POST_URI));

            h.doc.insert_and_emit(h.doc.body(), article);
            h.touch(wrap);
            h.touch(article);
            assert_eq!(h.source.calls(), vec![POST_URI.to_string()]);
            assert_eq!(h.fetch_state(wrap), FetchState::Fetching);

            settle().await;
            let overlay = h.doc.overlay_for(wrap).expect("overlay after backfill");
            assert_eq!(overlay.text, "A slow pan over a harbor at dusk");
            assert_eq!(
                h.doc.attribute(&wrap, "alt").as_deref(),
                Some("A slow pan over a harbor at dusk")
            );
            assert_eq!(
                h.fetch_state(wrap),
                FetchState::Resolved("A slow pan over a harbor at dusk".to_string())
            );

            h.touch(wrap);
            settle().await;
            assert_eq!(h.source.calls().len(), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_resolved_text_restored_after_rerender() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::tokimeki_video();
            h.source.reply(Reply::Json(VIDEO_THREAD));
            let (article, wrap) = video_post(&h.doc, Some(POST_URI));
            h.doc.insert_and_emit(h.doc.body(), article);
            settle().await;

            // the cache write is observed and reprocessing is a no-op
            h.doc.flush();
            settle().await;
            assert_eq!(h.doc.overlays().len(), 1);

            // re-render wipes both the cached alt and the button
            h.doc.set_attribute(&wrap, "alt", "");
            h.doc.remove(h.doc.button_of(wrap).unwrap());
            h.doc.flush();
            settle().await;

            assert_eq!(h.source.calls().len(), 1);
            assert_eq!(h.doc.overlays().len(), 1);
            assert_eq!(
                h.doc.overlay_for(wrap).map(|o| o.text),
                Some("A slow pan over a harbor at dusk".to_string())
            );
            assert_eq!(
                h.doc.attribute(&wrap, "alt").as_deref(),
                Some("A slow pan over a harbor at dusk")
            );
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_fetch_retries_on_next_mutation() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::tokimeki_video();
            h.source.reply(Reply::Status(503));
            h.source.reply(Reply::Json(VIDEO_THREAD));
            let (article, wrap) = video_post(&h.doc, Some(POST_URI));

            h.doc.insert_and_emit(h.doc.body(), article);
            settle().await;
            assert!(h.doc.overlays().is_empty());
            assert_eq!(h.fetch_state(wrap), FetchState::Idle);

            h.touch(wrap);
            settle().await;
            assert_eq!(h.source.calls().len(), 2);
            assert!(h.doc.overlay_for(wrap).is_some());
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_response_without_alt_leaves_container_idle() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::tokimeki_video();
            h.source.reply(Reply::Json(r#"{"thread":{"post":{"embed":{"alt":"埋め込み動画"}}}}"#));
            let (article, wrap) = video_post(&h.doc, Some(POST_URI));

            h.doc.insert_and_emit(h.doc.body(), article);
            settle().await;
            assert!(h.doc.overlays().is_empty());
            assert!(h.doc.attribute(&wrap, "alt").is_none());
            assert_eq!(h.fetch_state(wrap), FetchState::Idle);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_missing_post_id_never_fetches() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::tokimeki_video();
            let (article, wrap) = video_post(&h.doc, None);

            h.doc.insert_and_emit(h.doc.body(), article);
            settle().await;
            assert!(h.source.calls().is_empty());
            assert!(h.doc.overlays().is_empty());
            assert_eq!(h.fetch_state(wrap), FetchState::Idle);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_backfill_waits_for_media_element() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::tokimeki_video();
            let article = h.doc.create("article.timeline__item", &[]);
            let content = h.doc.add(article, "div.timeline__content", &[("data-aturi", POST_URI)]);
            let wrap = h.doc.add(content, "div.timeline-video-wrap", &[]);

            h.doc.insert_and_emit(h.doc.body(), article);
            settle().await;
            assert!(h.source.calls().is_empty());

            h.source.reply(Reply::Json(VIDEO_THREAD));
            let player = h.doc.add(wrap, "div.video-player", &[]);
            h.doc.emit(vec![Mutation::new(wrap, vec![player])]);
            settle().await;
            assert_eq!(h.source.calls().len(), 1);
            assert!(h.doc.overlay_for(wrap).is_some());
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_inline_alt_skips_backfill() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::tokimeki_video();
            let (article, wrap) = video_post(&h.doc, Some(POST_URI));
            h.doc.set_attribute(&wrap, "alt", "Alt: A timelapse of clouds over the ridge");

            h.doc.insert_and_emit(h.doc.body(), article);
            settle().await;
            assert!(h.source.calls().is_empty());
            assert_eq!(
                h.doc.overlay_for(wrap).map(|o| o.text),
                Some("A timelapse of clouds over the ridge".to_string())
            );
        })
        .await;
}

// ─────────────────────────────────────────────────────────────────────────────
// Hover and copy
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_hover_shows_positions_and_hides_tooltip() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::twitter();
            let (article, photo) = tweet(&h.doc, "A street market under paper lanterns");
            h.doc.insert_and_emit(h.doc.body(), article);

            h.doc.hover(photo, HoverTarget::Container, true);
            let overlay = h.doc.overlay_for(photo).unwrap();
            assert!(overlay.button_visible);
            assert!(!overlay.tooltip_visible);

            h.doc.hover(photo, HoverTarget::Button, true);
            let overlay = h.doc.overlay_for(photo).unwrap();
            assert!(overlay.tooltip_visible);
            // button at (112, 210) in the viewport: tooltip goes below, right-aligned
            assert_eq!(overlay.tooltip_position, Some(Point::new(42.0, 242.0)));

            // pointer travels from button to tooltip within the grace period
            h.doc.hover(photo, HoverTarget::Button, false);
            sleep(Duration::from_millis(150)).await;
            assert!(h.doc.overlay_for(photo).unwrap().tooltip_visible);
            h.doc.hover(photo, HoverTarget::Tooltip, true);
            sleep(Duration::from_millis(100)).await;
            assert!(h.doc.overlay_for(photo).unwrap().tooltip_visible);

            h.doc.hover(photo, HoverTarget::Tooltip, false);
            sleep(Duration::from_millis(250)).await;
            let overlay = h.doc.overlay_for(photo).unwrap();
            assert!(!overlay.tooltip_visible);
            assert!(overlay.button_visible);

            h.doc.hover(photo, HoverTarget::Container, false);
            assert!(!h.doc.overlay_for(photo).unwrap().button_visible);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_modal_overlay_positions_relative_to_container() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::twitter();
            let dialog = h.doc.create("dialog", &[]);
            let (article, photo) = tweet(&h.doc, "A close-up of frost on a leaf");
            h.doc.set_static(photo, false);
            h.doc.append(dialog, article);
            h.doc.insert_and_emit(h.doc.body(), dialog);

            let overlay = h.doc.overlay_for(photo).unwrap();
            assert_eq!(overlay.host, TooltipHost::Container);
            assert!(!h.doc.has_class(photo, RELATIVE_CLASS));

            h.doc.hover(photo, HoverTarget::Button, true);
            assert_eq!(
                h.doc.overlay_for(photo).unwrap().tooltip_position,
                Some(Point::new(12.0, 42.0))
            );
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_copy_confirms_then_reverts() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::twitter();
            let (article, photo) = tweet(&h.doc, "Alt: A kettle on a camping stove");
            h.doc.insert_and_emit(h.doc.body(), article);

            h.doc.click(photo);
            sleep(Duration::from_millis(10)).await;
            assert_eq!(h.doc.clipboard(), vec!["A kettle on a camping stove".to_string()]);
            assert_eq!(h.doc.overlay_for(photo).unwrap().icon, Icon::Done);

            sleep(Duration::from_millis(1500)).await;
            assert_eq!(h.doc.overlay_for(photo).unwrap().icon, Icon::Copy);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_copy_failure_shows_error_icon() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::twitter();
            let (article, photo) = tweet(&h.doc, "A kettle on a camping stove");
            h.doc.insert_and_emit(h.doc.body(), article);
            h.doc.fail_clipboard(true);

            h.doc.click(photo);
            sleep(Duration::from_millis(10)).await;
            assert!(h.doc.clipboard().is_empty());
            assert_eq!(h.doc.overlay_for(photo).unwrap().icon, Icon::Failed);

            sleep(Duration::from_millis(1500)).await;
            assert_eq!(h.doc.overlay_for(photo).unwrap().icon, Icon::Copy);
        })
        .await;
}
