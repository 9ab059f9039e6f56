//! Copy button + tooltip overlays.
//!
//! The pure parts (clamping, placement, hover and copy state machines) live
//! in [`geometry`] and [`hover`]. [`OverlayManager`] drives them against an
//! [`OverlaySurface`], the rendering half of the DOM abstraction.

pub mod geometry;
pub mod hover;
mod manager;

use std::rc::Rc;

use altlens_types::{Anchor, Edge};

use crate::dom::Document;
use crate::error::ClipboardError;
use crate::runtime::LocalBoxFuture;

pub use geometry::{OverlayMetrics, Point, Rect, Size};
pub use hover::{CopyFeedback, HoverMachine, HoverTarget, HoverUpdate, Icon, TooltipAction, TooltipPhase};
pub use manager::OverlayManager;

/// Containers inside a node matching this are in a modal context.
pub const MODAL_SELECTOR: &str = "dialog";

/// Class marking the overlay button; its presence inside a container is the
/// idempotence guard.
pub const BUTTON_CLASS: &str = "alt-button";
pub const TOOLTIP_CLASS: &str = "alt-tooltip";

/// Class forcing `position: relative` on static containers.
pub const RELATIVE_CLASS: &str = "alt-container-relative";

/// Where the tooltip element is appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TooltipHost {
    /// Inside the container; offsets are container-relative.
    Container,
    /// At the end of the body; coordinates are document-absolute.
    Body,
}

/// Everything the surface needs to build one overlay pair.
#[derive(Debug)]
pub struct MountRequest<'a, N> {
    pub container: &'a N,
    pub text: &'a str,
    /// Declared anchor, before clamping.
    pub anchor: Anchor,
    /// Inline style declarations for the button.
    pub button_style: &'a [(Edge, String)],
    pub host: TooltipHost,
}

/// User interaction reported by a mounted overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayEvent {
    Pointer { target: HoverTarget, inside: bool },
    /// The button was clicked. The surface has already suppressed the
    /// default action and propagation.
    CopyClicked,
}

pub type OverlayEvents = Rc<dyn Fn(OverlayEvent)>;

/// Rendering access to the page.
pub trait OverlaySurface: Document {
    type Overlay: 'static;

    /// Whether `container` already holds an overlay button.
    fn has_overlay(&self, container: &Self::Node) -> bool;

    /// Whether the container's computed `position` is `static`.
    fn is_static_positioned(&self, container: &Self::Node) -> bool;

    fn add_class(&self, node: &Self::Node, class: &str);

    /// Create the button inside the container and the tooltip at the
    /// requested host, both initially hidden. Pointer and click events on the
    /// button, the tooltip and the container are forwarded to `events`.
    ///
    /// Returns `None` if the page refused the new elements.
    fn mount(&self, request: MountRequest<'_, Self::Node>, events: OverlayEvents) -> Option<Self::Overlay>;

    /// Remove the tooltip and button from the page.
    fn unmount(&self, overlay: &Self::Overlay);

    fn set_button_visible(&self, overlay: &Self::Overlay, visible: bool);

    fn set_tooltip_visible(&self, overlay: &Self::Overlay, visible: bool);

    fn measure(&self, overlay: &Self::Overlay) -> OverlayMetrics;

    /// Position the tooltip in its host's coordinate system.
    fn move_tooltip(&self, overlay: &Self::Overlay, position: Point);

    fn set_icon(&self, overlay: &Self::Overlay, icon: Icon);

    fn write_clipboard(&self, text: &str) -> LocalBoxFuture<Result<(), ClipboardError>>;
}
