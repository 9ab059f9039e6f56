//! Page DOM abstraction.
//!
//! The engine never touches a browser API directly. It reads the page through
//! [`Document`], renders through [`crate::overlay::OverlaySurface`] and hears
//! about structural changes through [`MutationFeed`]. The browser binding
//! implements these on `web-sys`; tests use [`memory::MemoryDocument`].
//!
//! Selectors are passed through as opaque strings. An invalid selector is an
//! absence of match, never an error.

#[cfg(any(test, feature = "testing"))]
pub mod memory;

/// Stable identity of a DOM node for side-tables.
pub type NodeKey = u64;

/// Read access to the page.
pub trait Document: 'static {
    type Node: Clone + 'static;

    /// Identity of `node`; equal for the same node across calls.
    fn key(&self, node: &Self::Node) -> NodeKey;

    /// The page body, scope of the initial scan.
    fn body(&self) -> Self::Node;

    /// Mutation targets and inserted nodes may be text or comment nodes.
    fn is_element(&self, node: &Self::Node) -> bool;

    fn matches(&self, node: &Self::Node, selector: &str) -> bool;

    /// All descendants of `scope` matching `selector`, in document order.
    fn query_all(&self, scope: &Self::Node, selector: &str) -> Vec<Self::Node>;

    fn query_first(&self, scope: &Self::Node, selector: &str) -> Option<Self::Node> {
        self.query_all(scope, selector).into_iter().next()
    }

    /// Nearest inclusive ancestor matching `selector`.
    fn closest(&self, node: &Self::Node, selector: &str) -> Option<Self::Node>;

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str);

    /// Text as displayed to the user (`innerText`).
    fn rendered_text(&self, node: &Self::Node) -> String;

    /// Laid-out width in CSS pixels; 0 when not rendered yet.
    fn offset_width(&self, node: &Self::Node) -> f64;

    /// Whether the node is still attached to the page.
    fn is_connected(&self, node: &Self::Node) -> bool;
}

/// One structural change record.
#[derive(Debug, Clone)]
pub struct Mutation<N> {
    /// Node whose children or attributes changed.
    pub target: N,
    /// Nodes inserted under `target`.
    pub added: Vec<N>,
}

impl<N> Mutation<N> {
    pub fn new(target: N, added: Vec<N>) -> Self {
        Self { target, added }
    }
}

pub type MutationHandler<N> = Box<dyn FnMut(Vec<Mutation<N>>)>;

/// Subscription to structural page changes.
pub trait MutationFeed: Document {
    /// Deliver every future batch of changes under the body to `handler`:
    /// child insertions and removals, and changes to the named attributes.
    fn observe(&self, attributes: &[String], handler: MutationHandler<Self::Node>);

    /// Invoke `handler` once the page has finished loading.
    fn on_load(&self, handler: Box<dyn FnOnce()>);
}
