//! Button clamping and tooltip placement.
//!
//! Two coordinate systems are in play. Inside a modal the tooltip lives in
//! the container, so placement is offset arithmetic against the button.
//! Elsewhere the tooltip lives in the body and placement uses the button's
//! viewport rectangle plus the scroll position.

use altlens_types::formatting::format_clamp;
use altlens_types::{Anchor, Edge};

/// Minimum distance between the button and the container edge.
pub const MIN_INSET: f64 = 5.0;

/// Button footprint (30px button plus margin) reserved at the far edge.
pub const BUTTON_INSET: f64 = 35.0;

/// Rendered button side length, matching the injected stylesheet.
pub const BUTTON_SIZE: f64 = 30.0;

/// Gap between button and tooltip.
pub const TOOLTIP_GAP: f64 = 2.0;

/// Minimum distance between a body-hosted tooltip and the viewport's left edge.
pub const VIEWPORT_MARGIN: f64 = 10.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Layout readings taken when the tooltip is about to show.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OverlayMetrics {
    /// Button offset relative to its container.
    pub button_offset: Rect,
    pub container_height: f64,
    /// Button bounding rectangle in viewport coordinates.
    pub button_client: Rect,
    pub scroll: Point,
    pub viewport_height: f64,
    pub tooltip: Size,
}

// ─────────────────────────────────────────────────────────────────────────────
// Button Clamping
// ─────────────────────────────────────────────────────────────────────────────

/// Inline style declarations for the button, each coordinate wrapped in a
/// CSS clamp so small media never push the button outside the container.
pub fn clamped_anchor(anchor: &Anchor) -> Vec<(Edge, String)> {
    anchor
        .edges()
        .map(|(edge, v)| (edge, format_clamp(MIN_INSET, v, BUTTON_INSET)))
        .collect()
}

/// Value the browser resolves a clamped coordinate to for a container
/// extent of `extent` pixels along the same axis.
pub fn resolve_clamped(value: f64, extent: f64) -> f64 {
    value.min(extent - BUTTON_INSET).max(MIN_INSET)
}

/// Button rectangle inside a `size` container after clamping.
pub fn button_offset(anchor: &Anchor, size: Size) -> Rect {
    let y = match (anchor.top, anchor.bottom) {
        (Some(top), _) => resolve_clamped(top, size.height),
        (None, Some(bottom)) => size.height - BUTTON_SIZE - resolve_clamped(bottom, size.height),
        (None, None) => 0.0,
    };
    let x = match (anchor.left, anchor.right) {
        (Some(left), _) => resolve_clamped(left, size.width),
        (None, Some(right)) => size.width - BUTTON_SIZE - resolve_clamped(right, size.width),
        (None, None) => 0.0,
    };
    Rect::new(x, y, BUTTON_SIZE, BUTTON_SIZE)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tooltip Placement
// ─────────────────────────────────────────────────────────────────────────────

/// Tooltip position relative to the container (modal context).
///
/// Below the button when it sits in the upper half of the container, above
/// otherwise. Left edges align for left-anchored buttons, right edges for
/// right-anchored ones.
pub fn place_in_container(metrics: &OverlayMetrics, left_anchored: bool) -> Point {
    let button = metrics.button_offset;
    let tip = metrics.tooltip;

    let y = if button.y < metrics.container_height / 2.0 {
        button.bottom() + TOOLTIP_GAP
    } else {
        button.y - tip.height - TOOLTIP_GAP
    };
    let x = if left_anchored {
        button.x
    } else {
        button.right() - tip.width
    };
    Point::new(x, y)
}

/// Tooltip position in document coordinates (body context).
///
/// Below the button when it sits in the upper half of the viewport, above
/// otherwise. Right-aligned with the button, never closer than
/// [`VIEWPORT_MARGIN`] to the left edge.
pub fn place_in_document(metrics: &OverlayMetrics) -> Point {
    let button = metrics.button_client;
    let tip = metrics.tooltip;
    let scroll = metrics.scroll;

    let y = if button.y < metrics.viewport_height / 2.0 {
        button.bottom() + scroll.y + TOOLTIP_GAP
    } else {
        button.y + scroll.y - tip.height - TOOLTIP_GAP
    };
    let x = (button.right() + scroll.x - tip.width).max(VIEWPORT_MARGIN);
    Point::new(x, y)
}
