//! In-memory document for tests.
//!
//! Implements [`Document`], [`OverlaySurface`] and [`MutationFeed`] over a
//! plain node arena so the engine can be driven with synthetic mutation
//! batches and pointer events, no browser required.
//!
//! Selector support is deliberately small: comma lists of compound selectors
//! made of an optional tag, `.class` and `[attr]` / `[attr="value"]` parts.
//! Anything else (combinators, pseudo-classes) never matches.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use altlens_types::Edge;

use super::{Document, Mutation, MutationFeed, MutationHandler, NodeKey};
use crate::error::ClipboardError;
use crate::overlay::geometry::{BUTTON_SIZE, button_offset};
use crate::overlay::{
    BUTTON_CLASS, Icon, MountRequest, OverlayEvent, OverlayEvents, OverlayMetrics, OverlaySurface,
    Point, Rect, Size, TooltipHost, HoverTarget,
};
use crate::runtime::LocalBoxFuture;

const TEXT_TAG: &str = "#text";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemNode(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemOverlay(usize);

#[derive(Debug, Default)]
struct NodeData {
    tag: String,
    classes: Vec<String>,
    attrs: BTreeMap<String, String>,
    text: String,
    parent: Option<usize>,
    children: Vec<usize>,
    /// Page coordinates.
    rect: Rect,
    static_position: bool,
}

/// Observable state of one mounted overlay.
#[derive(Debug, Clone)]
pub struct OverlayRecord {
    pub container: MemNode,
    pub text: String,
    pub button_style: Vec<(Edge, String)>,
    pub anchor: altlens_types::Anchor,
    pub host: TooltipHost,
    pub button_visible: bool,
    pub tooltip_visible: bool,
    pub tooltip_position: Option<Point>,
    pub icon: Icon,
    pub mounted: bool,
    button: MemNode,
}

pub struct MemoryDocument {
    nodes: RefCell<Vec<NodeData>>,
    overlays: RefCell<Vec<OverlayRecord>>,
    overlay_events: RefCell<Vec<OverlayEvents>>,
    mutation_handler: RefCell<Option<MutationHandler<MemNode>>>,
    watched_attributes: RefCell<Vec<String>>,
    /// Attribute records awaiting delivery.
    pending: RefCell<Vec<Mutation<MemNode>>>,
    load_handlers: RefCell<Vec<Box<dyn FnOnce()>>>,
    clipboard: RefCell<Vec<String>>,
    clipboard_fails: Cell<bool>,
    viewport: Cell<Size>,
    scroll: Cell<Point>,
    tooltip_size: Cell<Size>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// An empty page with a static `body`, 1280x800 viewport.
    pub fn new() -> Self {
        let body = NodeData {
            tag: "body".to_string(),
            static_position: true,
            ..Default::default()
        };
        Self {
            nodes: RefCell::new(vec![body]),
            overlays: RefCell::new(Vec::new()),
            overlay_events: RefCell::new(Vec::new()),
            mutation_handler: RefCell::new(None),
            watched_attributes: RefCell::new(Vec::new()),
            pending: RefCell::new(Vec::new()),
            load_handlers: RefCell::new(Vec::new()),
            clipboard: RefCell::new(Vec::new()),
            clipboard_fails: Cell::new(false),
            viewport: Cell::new(Size::new(1280.0, 800.0)),
            scroll: Cell::new(Point::default()),
            tooltip_size: Cell::new(Size::new(240.0, 60.0)),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Building
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a detached element from a `tag.class.class` descriptor.
    pub fn create(&self, descriptor: &str, attrs: &[(&str, &str)]) -> MemNode {
        let (tag, classes) = match descriptor.split_once('.') {
            Some((tag, classes)) => (tag, classes.split('.').map(str::to_string).collect()),
            None => (descriptor, Vec::new()),
        };
        let data = NodeData {
            tag: tag.to_string(),
            classes,
            attrs: attrs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            static_position: true,
            ..Default::default()
        };
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(data);
        MemNode(nodes.len() - 1)
    }

    /// Create a detached text node.
    pub fn create_text(&self, text: &str) -> MemNode {
        let node = self.create(TEXT_TAG, &[]);
        self.set_text(node, text);
        node
    }

    pub fn append(&self, parent: MemNode, child: MemNode) {
        let mut nodes = self.nodes.borrow_mut();
        if let Some(old) = nodes[child.0].parent.take() {
            nodes[old].children.retain(|c| *c != child.0);
        }
        nodes[child.0].parent = Some(parent.0);
        nodes[parent.0].children.push(child.0);
    }

    /// Create an element and append it to `parent`.
    pub fn add(&self, parent: MemNode, descriptor: &str, attrs: &[(&str, &str)]) -> MemNode {
        let node = self.create(descriptor, attrs);
        self.append(parent, node);
        node
    }

    /// Detach `node` (and its subtree) from the page.
    pub fn remove(&self, node: MemNode) {
        let mut nodes = self.nodes.borrow_mut();
        if let Some(parent) = nodes[node.0].parent.take() {
            nodes[parent].children.retain(|c| *c != node.0);
        }
    }

    pub fn set_text(&self, node: MemNode, text: &str) {
        self.nodes.borrow_mut()[node.0].text = text.to_string();
    }

    pub fn set_rect(&self, node: MemNode, rect: Rect) {
        self.nodes.borrow_mut()[node.0].rect = rect;
    }

    pub fn set_static(&self, node: MemNode, is_static: bool) {
        self.nodes.borrow_mut()[node.0].static_position = is_static;
    }

    pub fn has_class(&self, node: MemNode, class: &str) -> bool {
        self.nodes.borrow()[node.0].classes.iter().any(|c| c == class)
    }

    pub fn set_viewport(&self, size: Size) {
        self.viewport.set(size);
    }

    pub fn set_scroll(&self, scroll: Point) {
        self.scroll.set(scroll);
    }

    pub fn set_tooltip_size(&self, size: Size) {
        self.tooltip_size.set(size);
    }

    pub fn fail_clipboard(&self, fails: bool) {
        self.clipboard_fails.set(fails);
    }

    pub fn clipboard(&self) -> Vec<String> {
        self.clipboard.borrow().clone()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Driving
    // ─────────────────────────────────────────────────────────────────────────

    /// Deliver a mutation batch to the observer, if one subscribed.
    pub fn emit(&self, batch: Vec<Mutation<MemNode>>) {
        let handler = self.mutation_handler.borrow_mut().take();
        if let Some(mut handler) = handler {
            handler(batch);
            self.mutation_handler.borrow_mut().get_or_insert(handler);
        }
    }

    /// Deliver queued attribute records as one batch, the way the browser
    /// does at the end of a task.
    pub fn flush(&self) {
        let batch: Vec<_> = self.pending.borrow_mut().drain(..).collect();
        if !batch.is_empty() {
            self.emit(batch);
        }
    }

    /// Attribute names the observer subscribed to.
    pub fn watched_attributes(&self) -> Vec<String> {
        self.watched_attributes.borrow().clone()
    }

    /// Append `child` to `parent` and report the insertion.
    pub fn insert_and_emit(&self, parent: MemNode, child: MemNode) {
        self.append(parent, child);
        self.emit(vec![Mutation::new(parent, vec![child])]);
    }

    /// Fire the page load event.
    pub fn fire_load(&self) {
        let handlers: Vec<_> = self.load_handlers.borrow_mut().drain(..).collect();
        for handler in handlers {
            handler();
        }
    }

    /// Mounted overlays, in mount order.
    pub fn overlays(&self) -> Vec<OverlayRecord> {
        self.overlays.borrow().iter().filter(|o| o.mounted).cloned().collect()
    }

    pub fn overlay_for(&self, container: MemNode) -> Option<OverlayRecord> {
        self.overlays
            .borrow()
            .iter()
            .find(|o| o.mounted && o.container == container)
            .cloned()
    }

    /// The overlay button mounted inside `container`, if any.
    pub fn button_of(&self, container: MemNode) -> Option<MemNode> {
        self.overlay_for(container).map(|o| o.button)
    }

    fn dispatch(&self, container: MemNode, event: OverlayEvent) {
        let index = self
            .overlays
            .borrow()
            .iter()
            .position(|o| o.mounted && o.container == container);
        let Some(index) = index else {
            return;
        };
        let events = self.overlay_events.borrow()[index].clone();
        events(event);
    }

    /// Move the pointer into or out of part of the overlay on `container`.
    pub fn hover(&self, container: MemNode, target: HoverTarget, inside: bool) {
        self.dispatch(container, OverlayEvent::Pointer { target, inside });
    }

    pub fn click(&self, container: MemNode) {
        self.dispatch(container, OverlayEvent::CopyClicked);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tree helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn descendants(&self, scope: usize, out: &mut Vec<usize>) {
        let children = self.nodes.borrow()[scope].children.clone();
        for child in children {
            out.push(child);
            self.descendants(child, out);
        }
    }

    fn node_matches(&self, index: usize, selector: &str) -> bool {
        let nodes = self.nodes.borrow();
        let node = &nodes[index];
        selector
            .split(',')
            .filter_map(parse_compound)
            .any(|compound| compound.matches(node))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Selectors
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Compound {
    tag: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

impl Compound {
    fn matches(&self, node: &NodeData) -> bool {
        if node.tag == TEXT_TAG {
            return false;
        }
        self.tag.as_ref().is_none_or(|t| *t == node.tag)
            && self.classes.iter().all(|c| node.classes.contains(c))
            && self.attrs.iter().all(|(name, value)| match (node.attrs.get(name), value) {
                (Some(actual), Some(expected)) => actual == expected,
                (Some(_), None) => true,
                (None, _) => false,
            })
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn parse_compound(input: &str) -> Option<Compound> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let mut compound = Compound::default();
    let tag_end = input.find(['.', '[']).unwrap_or(input.len());
    let tag = &input[..tag_end];
    if !tag.is_empty() {
        if !tag.chars().all(is_ident_char) {
            return None;
        }
        compound.tag = Some(tag.to_string());
    }

    let mut rest = &input[tag_end..];
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('.') {
            let end = after.find(['.', '[']).unwrap_or(after.len());
            let class = &after[..end];
            if class.is_empty() || !class.chars().all(is_ident_char) {
                return None;
            }
            compound.classes.push(class.to_string());
            rest = &after[end..];
        } else if let Some(after) = rest.strip_prefix('[') {
            let end = after.find(']')?;
            let (name, value) = match after[..end].split_once('=') {
                Some((name, value)) => (name, Some(value.trim_matches('"').to_string())),
                None => (&after[..end], None),
            };
            if name.is_empty() || !name.chars().all(is_ident_char) {
                return None;
            }
            compound.attrs.push((name.to_string(), value));
            rest = &after[end + 1..];
        } else {
            return None;
        }
    }
    Some(compound)
}

// ─────────────────────────────────────────────────────────────────────────────
// Trait Implementations
// ─────────────────────────────────────────────────────────────────────────────

impl Document for MemoryDocument {
    type Node = MemNode;

    fn key(&self, node: &MemNode) -> NodeKey {
        node.0 as NodeKey
    }

    fn body(&self) -> MemNode {
        MemNode(0)
    }

    fn is_element(&self, node: &MemNode) -> bool {
        self.nodes.borrow()[node.0].tag != TEXT_TAG
    }

    fn matches(&self, node: &MemNode, selector: &str) -> bool {
        self.node_matches(node.0, selector)
    }

    fn query_all(&self, scope: &MemNode, selector: &str) -> Vec<MemNode> {
        let mut all = Vec::new();
        self.descendants(scope.0, &mut all);
        all.into_iter()
            .filter(|i| self.node_matches(*i, selector))
            .map(MemNode)
            .collect()
    }

    fn closest(&self, node: &MemNode, selector: &str) -> Option<MemNode> {
        let mut current = Some(node.0);
        while let Some(index) = current {
            if self.node_matches(index, selector) {
                return Some(MemNode(index));
            }
            current = self.nodes.borrow()[index].parent;
        }
        None
    }

    fn attribute(&self, node: &MemNode, name: &str) -> Option<String> {
        self.nodes.borrow()[node.0].attrs.get(name).cloned()
    }

    fn set_attribute(&self, node: &MemNode, name: &str, value: &str) {
        self.nodes.borrow_mut()[node.0]
            .attrs
            .insert(name.to_string(), value.to_string());

        let watched = self.watched_attributes.borrow().iter().any(|w| w == name);
        if watched && self.is_connected(node) {
            self.pending.borrow_mut().push(Mutation::new(*node, Vec::new()));
        }
    }

    fn rendered_text(&self, node: &MemNode) -> String {
        let (own, children) = {
            let nodes = self.nodes.borrow();
            (nodes[node.0].text.clone(), nodes[node.0].children.clone())
        };
        children
            .into_iter()
            .map(|c| self.rendered_text(&MemNode(c)))
            .fold(own, |acc, t| acc + &t)
    }

    fn offset_width(&self, node: &MemNode) -> f64 {
        self.nodes.borrow()[node.0].rect.width
    }

    fn is_connected(&self, node: &MemNode) -> bool {
        let nodes = self.nodes.borrow();
        let mut current = node.0;
        loop {
            if current == 0 {
                return true;
            }
            match nodes[current].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }
}

impl OverlaySurface for MemoryDocument {
    type Overlay = MemOverlay;

    fn has_overlay(&self, container: &MemNode) -> bool {
        self.query_first(container, &format!(".{BUTTON_CLASS}")).is_some()
    }

    fn is_static_positioned(&self, container: &MemNode) -> bool {
        self.nodes.borrow()[container.0].static_position
    }

    fn add_class(&self, node: &MemNode, class: &str) {
        let mut nodes = self.nodes.borrow_mut();
        let classes = &mut nodes[node.0].classes;
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
        }
        if class == crate::overlay::RELATIVE_CLASS {
            nodes[node.0].static_position = false;
        }
    }

    fn mount(&self, request: MountRequest<'_, MemNode>, events: OverlayEvents) -> Option<MemOverlay> {
        // the button is a real child so the presence guard sees it
        let button = self.create(&format!("div.{}", BUTTON_CLASS), &[]);
        let record = OverlayRecord {
            container: *request.container,
            text: request.text.to_string(),
            button_style: request.button_style.to_vec(),
            anchor: request.anchor,
            host: request.host,
            button_visible: false,
            tooltip_visible: false,
            tooltip_position: None,
            icon: Icon::Copy,
            mounted: true,
            button,
        };
        self.append(*request.container, button);

        let mut overlays = self.overlays.borrow_mut();
        overlays.push(record);
        self.overlay_events.borrow_mut().push(events);
        Some(MemOverlay(overlays.len() - 1))
    }

    fn unmount(&self, overlay: &MemOverlay) {
        let button = {
            let mut overlays = self.overlays.borrow_mut();
            overlays[overlay.0].mounted = false;
            overlays[overlay.0].button
        };
        self.remove(button);
    }

    fn set_button_visible(&self, overlay: &MemOverlay, visible: bool) {
        self.overlays.borrow_mut()[overlay.0].button_visible = visible;
    }

    fn set_tooltip_visible(&self, overlay: &MemOverlay, visible: bool) {
        self.overlays.borrow_mut()[overlay.0].tooltip_visible = visible;
    }

    fn measure(&self, overlay: &MemOverlay) -> OverlayMetrics {
        let (container, anchor) = {
            let overlays = self.overlays.borrow();
            let record = &overlays[overlay.0];
            (record.container, record.anchor)
        };
        let rect = self.nodes.borrow()[container.0].rect;
        let offset = button_offset(&anchor, Size::new(rect.width, rect.height));
        let scroll = self.scroll.get();
        OverlayMetrics {
            button_offset: offset,
            container_height: rect.height,
            button_client: Rect::new(
                rect.x + offset.x - scroll.x,
                rect.y + offset.y - scroll.y,
                BUTTON_SIZE,
                BUTTON_SIZE,
            ),
            scroll,
            viewport_height: self.viewport.get().height,
            tooltip: self.tooltip_size.get(),
        }
    }

    fn move_tooltip(&self, overlay: &MemOverlay, position: Point) {
        self.overlays.borrow_mut()[overlay.0].tooltip_position = Some(position);
    }

    fn set_icon(&self, overlay: &MemOverlay, icon: Icon) {
        self.overlays.borrow_mut()[overlay.0].icon = icon;
    }

    fn write_clipboard(&self, text: &str) -> LocalBoxFuture<Result<(), ClipboardError>> {
        let result = if self.clipboard_fails.get() {
            Err(ClipboardError::Rejected("write permission denied".to_string()))
        } else {
            self.clipboard.borrow_mut().push(text.to_string());
            Ok(())
        };
        Box::pin(std::future::ready(result))
    }
}

impl MutationFeed for MemoryDocument {
    fn observe(&self, attributes: &[String], handler: MutationHandler<MemNode>) {
        *self.watched_attributes.borrow_mut() = attributes.to_vec();
        *self.mutation_handler.borrow_mut() = Some(handler);
    }

    fn on_load(&self, handler: Box<dyn FnOnce()>) {
        self.load_handlers.borrow_mut().push(handler);
    }
}
