//! Shared configuration types for ALTLENS.
//!
//! Used by both the engine (`altlens-core`) and the browser binding
//! (`altlens-app`); this crate has no DOM or async dependencies.

pub mod formatting;
pub mod platform;
pub mod settings;

pub use platform::{
    Anchor, BackfillRule, Edge, PlatformConfig, TargetConfig, TextSource, catalog, resolve,
    resolve_in,
};
pub use settings::{PLACEHOLDER_STRINGS, ViewerSettings};
