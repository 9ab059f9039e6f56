//! Overlay lifecycle: attach, hover handling, copy action, pruning.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use altlens_types::formatting::format_preview;
use altlens_types::{Anchor, ViewerSettings};
use tracing::{debug, info, warn};

use super::geometry::{clamped_anchor, place_in_container, place_in_document};
use super::hover::{CopyFeedback, HoverMachine, HoverTarget, TooltipAction};
use super::{
    MODAL_SELECTOR, MountRequest, OverlayEvent, OverlayEvents, OverlaySurface, RELATIVE_CLASS,
    TooltipHost,
};
use crate::dom::NodeKey;
use crate::error::ClipboardError;
use crate::runtime::Runtime;

/// One mounted button + tooltip and its interaction state.
struct OverlayPair<D: OverlaySurface> {
    container: D::Node,
    overlay: D::Overlay,
    text: String,
    host: TooltipHost,
    left_anchored: bool,
    hover: HoverMachine,
    feedback: CopyFeedback,
}

/// Owns every overlay on the page, keyed by container identity.
pub struct OverlayManager<D: OverlaySurface, R: Runtime> {
    dom: Rc<D>,
    runtime: Rc<R>,
    settings: Rc<ViewerSettings>,
    overlays: RefCell<HashMap<NodeKey, OverlayPair<D>>>,
    this: Weak<Self>,
}

impl<D: OverlaySurface, R: Runtime> OverlayManager<D, R> {
    pub fn new(dom: Rc<D>, runtime: Rc<R>, settings: Rc<ViewerSettings>) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            dom,
            runtime,
            settings,
            overlays: RefCell::new(HashMap::new()),
            this: this.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.overlays.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.borrow().is_empty()
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.overlays.borrow().contains_key(&key)
    }

    /// Mount an overlay on `container` showing `text`.
    ///
    /// Returns false if the container already carries one.
    pub fn attach(&self, container: &D::Node, text: &str, anchor: &Anchor) -> bool {
        if self.dom.has_overlay(container) {
            return false;
        }

        let host = if self.dom.closest(container, MODAL_SELECTOR).is_some() {
            TooltipHost::Container
        } else {
            TooltipHost::Body
        };
        if self.dom.is_static_positioned(container) {
            self.dom.add_class(container, RELATIVE_CLASS);
        }

        let key = self.dom.key(container);
        let button_style = clamped_anchor(anchor);
        let Some(overlay) = self.dom.mount(
            MountRequest {
                container,
                text,
                anchor: *anchor,
                button_style: &button_style,
                host,
            },
            self.event_sink(key),
        ) else {
            warn!(key, "Failed to mount overlay");
            return false;
        };

        // the page dropped our button but kept the container
        let replaced = self.overlays.borrow_mut().remove(&key);
        if let Some(old) = replaced {
            debug!(key, "Replacing overlay whose button was removed");
            self.dom.unmount(&old.overlay);
        }

        self.overlays.borrow_mut().insert(
            key,
            OverlayPair {
                container: container.clone(),
                overlay,
                text: text.to_string(),
                host,
                left_anchored: anchor.is_left_anchored(),
                hover: HoverMachine::new(),
                feedback: CopyFeedback::default(),
            },
        );

        info!(key, ?host, preview = %format_preview(text, 80), "Overlay attached");
        true
    }

    fn event_sink(&self, key: NodeKey) -> OverlayEvents {
        let this = self.this.clone();
        Rc::new(move |event| {
            if let Some(this) = this.upgrade() {
                this.handle(key, event);
            }
        })
    }

    /// Apply a user interaction reported by the surface.
    pub fn handle(&self, key: NodeKey, event: OverlayEvent) {
        match event {
            OverlayEvent::Pointer { target, inside } => self.pointer(key, target, inside),
            OverlayEvent::CopyClicked => self.copy(key),
        }
    }

    fn pointer(&self, key: NodeKey, target: HoverTarget, inside: bool) {
        let mut overlays = self.overlays.borrow_mut();
        let Some(pair) = overlays.get_mut(&key) else {
            return;
        };

        let update = pair.hover.pointer(target, inside);
        self.dom.set_button_visible(&pair.overlay, update.button_visible);

        match update.tooltip {
            TooltipAction::Show => {
                self.dom.set_tooltip_visible(&pair.overlay, true);
                let metrics = self.dom.measure(&pair.overlay);
                let position = match pair.host {
                    TooltipHost::Container => place_in_container(&metrics, pair.left_anchored),
                    TooltipHost::Body => place_in_document(&metrics),
                };
                self.dom.move_tooltip(&pair.overlay, position);
            }
            TooltipAction::ScheduleHide { generation } => {
                let this = self.this.clone();
                self.runtime.schedule(
                    self.settings.hide_grace_ms,
                    Box::new(move || {
                        if let Some(this) = this.upgrade() {
                            this.grace_elapsed(key, generation);
                        }
                    }),
                );
            }
            TooltipAction::None => {}
        }
    }

    fn grace_elapsed(&self, key: NodeKey, generation: u64) {
        let mut overlays = self.overlays.borrow_mut();
        if let Some(pair) = overlays.get_mut(&key)
            && pair.hover.grace_elapsed(generation)
        {
            self.dom.set_tooltip_visible(&pair.overlay, false);
        }
    }

    fn copy(&self, key: NodeKey) {
        let Some(text) = self.overlays.borrow().get(&key).map(|p| p.text.clone()) else {
            return;
        };

        let write = self.dom.write_clipboard(&text);
        let this = self.this.clone();
        self.runtime.spawn(Box::pin(async move {
            let result = write.await;
            if let Some(this) = this.upgrade() {
                this.copy_finished(key, result);
            }
        }));
    }

    fn copy_finished(&self, key: NodeKey, result: Result<(), ClipboardError>) {
        let mut overlays = self.overlays.borrow_mut();
        let Some(pair) = overlays.get_mut(&key) else {
            return;
        };

        if let Err(e) = &result {
            warn!(key, error = %e, "Copy to clipboard failed");
        } else {
            debug!(key, "Alt text copied");
        }

        let (icon, generation) = pair.feedback.copied(result.is_ok());
        self.dom.set_icon(&pair.overlay, icon);

        let this = self.this.clone();
        self.runtime.schedule(
            self.settings.copy_feedback_ms,
            Box::new(move || {
                let Some(this) = this.upgrade() else {
                    return;
                };
                let overlays = this.overlays.borrow();
                if let Some(pair) = overlays.get(&key)
                    && let Some(icon) = pair.feedback.revert(generation)
                {
                    this.dom.set_icon(&pair.overlay, icon);
                }
            }),
        );
    }

    /// Unmount and forget overlays whose container left the page. Returns
    /// the number removed.
    pub fn prune_detached(&self) -> usize {
        let mut overlays = self.overlays.borrow_mut();
        let before = overlays.len();
        overlays.retain(|key, pair| {
            let connected = self.dom.is_connected(&pair.container);
            if !connected {
                debug!(key, "Container detached, removing overlay");
                self.dom.unmount(&pair.overlay);
            }
            connected
        });
        before - overlays.len()
    }
}
