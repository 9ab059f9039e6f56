//! Per-post processing: find media containers, obtain their text, attach
//! overlays.

use std::rc::Rc;

use altlens_types::{PlatformConfig, TargetConfig, ViewerSettings};
use tracing::{debug, trace};

use crate::dom::Document;
use crate::overlay::{OverlayManager, OverlaySurface};
use crate::resolver::{FetchState, RemoteAltResolver, ThreadSource};
use crate::runtime::Runtime;
use crate::text;

pub struct PostProcessor<D: OverlaySurface, S: ThreadSource, R: Runtime> {
    dom: Rc<D>,
    runtime: Rc<R>,
    platform: PlatformConfig,
    settings: Rc<ViewerSettings>,
    resolver: Rc<RemoteAltResolver<S>>,
    overlays: Rc<OverlayManager<D, R>>,
}

impl<D: OverlaySurface, S: ThreadSource, R: Runtime> PostProcessor<D, S, R> {
    pub fn new(
        dom: Rc<D>,
        runtime: Rc<R>,
        platform: PlatformConfig,
        settings: Rc<ViewerSettings>,
        source: S,
    ) -> Self {
        let resolver = Rc::new(RemoteAltResolver::new(source, Rc::clone(&settings)));
        let overlays = OverlayManager::new(Rc::clone(&dom), Rc::clone(&runtime), Rc::clone(&settings));
        Self {
            dom,
            runtime,
            platform,
            settings,
            resolver,
            overlays,
        }
    }

    pub fn platform(&self) -> &PlatformConfig {
        &self.platform
    }

    pub fn resolver(&self) -> &Rc<RemoteAltResolver<S>> {
        &self.resolver
    }

    pub fn overlays(&self) -> &Rc<OverlayManager<D, R>> {
        &self.overlays
    }

    /// Process every target of the platform under one post root.
    ///
    /// Safe to call repeatedly; containers that already carry an overlay or
    /// have a fetch outstanding are left alone.
    pub fn process(&self, root: &D::Node) {
        for target in &self.platform.targets {
            for container in self.dom.query_all(root, &target.container_selector) {
                self.process_container(&container, target);
            }
        }
    }

    fn process_container(&self, container: &D::Node, target: &TargetConfig) {
        if self.dom.has_overlay(container) {
            return;
        }

        if let Some(rule) = &target.backfill {
            let inline = self
                .dom
                .attribute(container, &rule.cache_attribute)
                .unwrap_or_default();
            if !text::is_valid(&inline, &self.settings) {
                if self.dom.query_first(container, &rule.media_selector).is_none() {
                    trace!("Backfill container has no media element yet");
                    return;
                }
                self.dispatch_backfill(container, target);
                return;
            }
        }

        let element = if target.text_selector.is_empty() {
            Some(container.clone())
        } else {
            self.dom.query_first(container, &target.text_selector)
        };
        let Some(element) = element else {
            return;
        };

        let alt = text::extract(self.dom.as_ref(), &element, &target.source);
        if !text::is_valid(&alt, &self.settings) {
            return;
        }

        let width = self.dom.offset_width(container);
        if width > 0.0 && width < self.settings.min_container_width {
            debug!(width, "Skipping icon-sized container");
            return;
        }

        self.overlays.attach(container, &alt, &target.anchor);
    }

    fn dispatch_backfill(&self, container: &D::Node, target: &TargetConfig) {
        let Some(rule) = &target.backfill else {
            return;
        };

        // re-rendered after an earlier lookup: restore from the side-table
        if let FetchState::Resolved(alt) = self.resolver.state(self.dom.key(container)) {
            self.dom.set_attribute(container, &rule.cache_attribute, &alt);
            self.overlays.attach(container, &alt, &target.anchor);
            return;
        }

        let Some(pending) = self.resolver.begin(&self.dom, container, rule) else {
            return;
        };

        let overlays = Rc::clone(&self.overlays);
        let container = container.clone();
        let anchor = target.anchor;
        self.runtime.spawn(Box::pin(async move {
            let alt = pending.await;
            if !alt.is_empty() {
                overlays.attach(&container, &alt, &anchor);
            }
        }));
    }

    /// Forget state for containers that left the page.
    pub fn prune_detached(&self) {
        let removed = self.overlays.prune_detached();
        if removed > 0 {
            debug!(removed, "Pruned detached overlays");
        }
        let overlays = &self.overlays;
        self.resolver.retain(|key| overlays.contains(key));
    }
}
