//! `web-sys` binding of the engine's page traits.

use std::cell::{Cell, RefCell};

use altlens_core::dom::{Document, Mutation, MutationFeed, MutationHandler, NodeKey};
use altlens_core::overlay::{
    BUTTON_CLASS, HoverTarget, Icon, MountRequest, OverlayEvent, OverlayEvents, OverlayMetrics,
    OverlaySurface, Point, Rect, Size, TOOLTIP_CLASS, TooltipHost,
};
use altlens_core::{ClipboardError, LocalBoxFuture};
use altlens_types::formatting::format_px;
use js_sys::{Array, Object, Reflect, WeakMap};
use tracing::warn;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    Element, Event, EventTarget, HtmlElement, MutationObserver, MutationObserverInit,
    MutationRecord, Node, NodeList, Window,
};

use crate::style::ICON_FONT_CLASS;

// ─────────────────────────────────────────────────────────────────────────────
// Event Listeners
// ─────────────────────────────────────────────────────────────────────────────

/// An event listener that unregisters itself when dropped.
struct Listener {
    target: EventTarget,
    kind: &'static str,
    capture: bool,
    closure: Closure<dyn FnMut(Event)>,
}

impl Listener {
    fn new(
        target: &EventTarget,
        kind: &'static str,
        capture: bool,
        handler: impl FnMut(Event) + 'static,
    ) -> Self {
        let closure = Closure::<dyn FnMut(Event)>::new(handler);
        let _ = target.add_event_listener_with_callback_and_bool(
            kind,
            closure.as_ref().unchecked_ref(),
            capture,
        );
        Self {
            target: target.clone(),
            kind,
            capture,
            closure,
        }
    }

    fn hover(target: &EventTarget, kind: &'static str, part: HoverTarget, events: &OverlayEvents) -> Self {
        let inside = kind == "mouseenter";
        let events = events.clone();
        Self::new(target, kind, false, move |_| {
            events(OverlayEvent::Pointer {
                target: part,
                inside,
            })
        })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        let _ = self.target.remove_event_listener_with_callback_and_bool(
            self.kind,
            self.closure.as_ref().unchecked_ref(),
            self.capture,
        );
    }
}

/// Elements and listeners of one mounted overlay.
pub struct WebOverlay {
    container: Node,
    button: HtmlElement,
    icon: Element,
    tooltip: HtmlElement,
    _listeners: Vec<Listener>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Document
// ─────────────────────────────────────────────────────────────────────────────

pub struct WebDocument {
    window: Window,
    document: web_sys::Document,
    /// Node identity; entries die with their nodes.
    keys: WeakMap,
    next_key: Cell<NodeKey>,
    observers: RefCell<Vec<(MutationObserver, Closure<dyn FnMut(Array, MutationObserver)>)>>,
}

impl WebDocument {
    pub fn new(window: Window) -> Option<Self> {
        let document = window.document()?;
        Some(Self {
            window,
            document,
            keys: WeakMap::new(),
            next_key: Cell::new(0),
            observers: RefCell::new(Vec::new()),
        })
    }

    pub fn document(&self) -> &web_sys::Document {
        &self.document
    }

    fn create_div(&self, class: &str) -> Option<HtmlElement> {
        let element = self.document.create_element("div").ok()?;
        element.set_class_name(class);
        element.dyn_into::<HtmlElement>().ok()
    }
}

fn as_element(node: &Node) -> Option<&Element> {
    node.dyn_ref::<Element>()
}

fn collect(list: NodeList) -> Vec<Node> {
    (0..list.length()).filter_map(|i| list.item(i)).collect()
}

fn describe(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

impl Document for WebDocument {
    type Node = Node;

    fn key(&self, node: &Node) -> NodeKey {
        let object: &Object = node.unchecked_ref();
        if let Some(key) = self.keys.get(object).as_f64() {
            return key as NodeKey;
        }
        let key = self.next_key.get() + 1;
        self.next_key.set(key);
        self.keys.set(object, &JsValue::from_f64(key as f64));
        key
    }

    fn body(&self) -> Node {
        match self.document.body() {
            Some(body) => body.into(),
            None => self.document.clone().into(),
        }
    }

    fn is_element(&self, node: &Node) -> bool {
        node.node_type() == Node::ELEMENT_NODE
    }

    fn matches(&self, node: &Node, selector: &str) -> bool {
        as_element(node).is_some_and(|el| el.matches(selector).unwrap_or(false))
    }

    fn query_all(&self, scope: &Node, selector: &str) -> Vec<Node> {
        let list = if let Some(el) = as_element(scope) {
            el.query_selector_all(selector)
        } else if let Some(doc) = scope.dyn_ref::<web_sys::Document>() {
            doc.query_selector_all(selector)
        } else {
            return Vec::new();
        };
        match list {
            Ok(list) => collect(list),
            Err(e) => {
                warn!(selector, error = %describe(&e), "Selector rejected by the page");
                Vec::new()
            }
        }
    }

    fn closest(&self, node: &Node, selector: &str) -> Option<Node> {
        let el = as_element(node)?;
        el.closest(selector).ok().flatten().map(Into::into)
    }

    fn attribute(&self, node: &Node, name: &str) -> Option<String> {
        as_element(node)?.get_attribute(name)
    }

    fn set_attribute(&self, node: &Node, name: &str, value: &str) {
        if let Some(el) = as_element(node) {
            let _ = el.set_attribute(name, value);
        }
    }

    fn rendered_text(&self, node: &Node) -> String {
        match node.dyn_ref::<HtmlElement>() {
            Some(el) => el.inner_text(),
            None => node.text_content().unwrap_or_default(),
        }
    }

    fn offset_width(&self, node: &Node) -> f64 {
        node.dyn_ref::<HtmlElement>()
            .map(|el| el.offset_width() as f64)
            .unwrap_or(0.0)
    }

    fn is_connected(&self, node: &Node) -> bool {
        node.is_connected()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Overlay Surface
// ─────────────────────────────────────────────────────────────────────────────

impl OverlaySurface for WebDocument {
    type Overlay = WebOverlay;

    fn has_overlay(&self, container: &Node) -> bool {
        as_element(container)
            .and_then(|el| el.query_selector(&format!(".{BUTTON_CLASS}")).ok().flatten())
            .is_some()
    }

    fn is_static_positioned(&self, container: &Node) -> bool {
        as_element(container)
            .and_then(|el| self.window.get_computed_style(el).ok().flatten())
            .and_then(|style| style.get_property_value("position").ok())
            .is_some_and(|position| position == "static")
    }

    fn add_class(&self, node: &Node, class: &str) {
        if let Some(el) = as_element(node) {
            let _ = el.class_list().add_1(class);
        }
    }

    fn mount(&self, request: MountRequest<'_, Node>, events: OverlayEvents) -> Option<WebOverlay> {
        let container = request.container;

        let button = self.create_div(BUTTON_CLASS)?;
        let icon = self.document.create_element("span").ok()?;
        icon.set_class_name(ICON_FONT_CLASS);
        icon.set_text_content(Some(Icon::Copy.glyph()));
        button.append_child(&icon).ok()?;
        let style = button.style();
        for (edge, value) in request.button_style {
            let _ = style.set_property(edge.css_property(), value);
        }

        let tooltip = self.create_div(TOOLTIP_CLASS)?;
        tooltip.set_text_content(Some(request.text));
        let host = match request.host {
            TooltipHost::Container => container.clone(),
            TooltipHost::Body => self.body(),
        };
        host.append_child(&tooltip).ok()?;
        container.append_child(&button).ok()?;

        let copy = {
            let events = events.clone();
            // capture phase, so the page's own link handlers never see the click
            Listener::new(&button, "click", true, move |event| {
                event.prevent_default();
                event.stop_propagation();
                event.stop_immediate_propagation();
                events(OverlayEvent::CopyClicked);
            })
        };
        let listeners = vec![
            copy,
            Listener::hover(container, "mouseenter", HoverTarget::Container, &events),
            Listener::hover(container, "mouseleave", HoverTarget::Container, &events),
            Listener::hover(&button, "mouseenter", HoverTarget::Button, &events),
            Listener::hover(&button, "mouseleave", HoverTarget::Button, &events),
            Listener::hover(&tooltip, "mouseenter", HoverTarget::Tooltip, &events),
            Listener::hover(&tooltip, "mouseleave", HoverTarget::Tooltip, &events),
        ];

        Some(WebOverlay {
            container: container.clone(),
            button,
            icon,
            tooltip,
            _listeners: listeners,
        })
    }

    fn unmount(&self, overlay: &WebOverlay) {
        overlay.tooltip.remove();
        overlay.button.remove();
    }

    fn set_button_visible(&self, overlay: &WebOverlay, visible: bool) {
        let opacity = if visible { "1" } else { "0" };
        let _ = overlay.button.style().set_property("opacity", opacity);
    }

    fn set_tooltip_visible(&self, overlay: &WebOverlay, visible: bool) {
        let style = overlay.tooltip.style();
        let (visibility, opacity) = if visible {
            ("visible", "1")
        } else {
            ("hidden", "0")
        };
        let _ = style.set_property("visibility", visibility);
        let _ = style.set_property("opacity", opacity);
    }

    fn measure(&self, overlay: &WebOverlay) -> OverlayMetrics {
        let button = &overlay.button;
        let client = button.get_bounding_client_rect();
        let container_height = overlay
            .container
            .dyn_ref::<HtmlElement>()
            .map(|el| el.offset_height() as f64)
            .unwrap_or(0.0);
        let viewport_height = self
            .window
            .inner_height()
            .ok()
            .and_then(|h| h.as_f64())
            .unwrap_or(0.0);

        OverlayMetrics {
            button_offset: Rect::new(
                button.offset_left() as f64,
                button.offset_top() as f64,
                button.offset_width() as f64,
                button.offset_height() as f64,
            ),
            container_height,
            button_client: Rect::new(client.x(), client.y(), client.width(), client.height()),
            scroll: Point::new(
                self.window.scroll_x().unwrap_or(0.0),
                self.window.scroll_y().unwrap_or(0.0),
            ),
            viewport_height,
            tooltip: Size::new(
                overlay.tooltip.offset_width() as f64,
                overlay.tooltip.offset_height() as f64,
            ),
        }
    }

    fn move_tooltip(&self, overlay: &WebOverlay, position: Point) {
        let style = overlay.tooltip.style();
        let _ = style.set_property("top", &format_px(position.y));
        let _ = style.set_property("left", &format_px(position.x));
    }

    fn set_icon(&self, overlay: &WebOverlay, icon: Icon) {
        overlay.icon.set_text_content(Some(icon.glyph()));
    }

    fn write_clipboard(&self, text: &str) -> LocalBoxFuture<Result<(), ClipboardError>> {
        let navigator = self.window.navigator();
        // absent outside secure contexts
        let available = Reflect::get(&navigator, &JsValue::from_str("clipboard"))
            .is_ok_and(|clipboard| !clipboard.is_undefined() && !clipboard.is_null());
        if !available {
            return Box::pin(std::future::ready(Err(ClipboardError::Unavailable)));
        }

        let promise = navigator.clipboard().write_text(text);
        Box::pin(async move {
            JsFuture::from(promise)
                .await
                .map(|_| ())
                .map_err(|e| ClipboardError::Rejected(describe(&e)))
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mutation Feed
// ─────────────────────────────────────────────────────────────────────────────

fn to_mutation(record: MutationRecord) -> Option<Mutation<Node>> {
    let target = record.target()?;
    Some(Mutation::new(target, collect(record.added_nodes())))
}

impl MutationFeed for WebDocument {
    fn observe(&self, attributes: &[String], mut handler: MutationHandler<Node>) {
        let callback = Closure::<dyn FnMut(Array, MutationObserver)>::new(
            move |records: Array, _observer: MutationObserver| {
                let batch: Vec<_> = records
                    .iter()
                    .filter_map(|r| r.dyn_into::<MutationRecord>().ok())
                    .filter_map(to_mutation)
                    .collect();
                handler(batch);
            },
        );

        let observer = match MutationObserver::new(callback.as_ref().unchecked_ref()) {
            Ok(observer) => observer,
            Err(e) => {
                warn!(error = %describe(&e), "Failed to create mutation observer");
                return;
            }
        };
        let options = MutationObserverInit::new();
        options.set_child_list(true);
        options.set_subtree(true);
        if !attributes.is_empty() {
            let filter: Array = attributes.iter().map(|name| JsValue::from_str(name)).collect();
            options.set_attributes(true);
            options.set_attribute_filter(&filter);
        }
        if let Err(e) = observer.observe_with_options(&self.body(), &options) {
            warn!(error = %describe(&e), "Failed to observe page");
            return;
        }

        self.observers.borrow_mut().push((observer, callback));
    }

    fn on_load(&self, handler: Box<dyn FnOnce()>) {
        if self.document.ready_state() == "complete" {
            handler();
            return;
        }
        let callback = Closure::once_into_js(move || handler());
        let _ = self
            .window
            .add_event_listener_with_callback("load", callback.unchecked_ref());
    }
}
