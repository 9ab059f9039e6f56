//! Alt text overlay engine.
//!
//! ```text
//!   MutationFeed ──▶ DomObserver ──▶ PostProcessor ──┬──▶ text (extract + validate)
//!                                                   ├──▶ RemoteAltResolver ──▶ ThreadSource
//!                                                   └──▶ OverlayManager ──▶ OverlaySurface
//! ```
//!
//! The engine is host-agnostic: the page is reached only through the traits
//! in [`dom`] and [`overlay`], and time only through [`runtime::Runtime`].

pub mod dom;
pub mod error;
pub mod observer;
pub mod overlay;
pub mod processor;
pub mod resolver;
pub mod runtime;
pub mod text;

#[cfg(test)]
mod engine_tests;

use std::rc::Rc;

use altlens_types::{PlatformConfig, ViewerSettings};
use tracing::debug;

pub use dom::{Document, Mutation, MutationFeed, NodeKey};
pub use error::{ClipboardError, ResolveError};
pub use observer::DomObserver;
pub use overlay::{OverlayManager, OverlaySurface};
pub use processor::PostProcessor;
pub use resolver::{BskyThreadClient, FetchState, RemoteAltResolver, ThreadSource};
pub use runtime::{LocalBoxFuture, LocalTask, Runtime};

/// Start the engine on a page.
///
/// Resolves the platform for `hostname` from the compiled-in catalog and
/// returns `None` (leaving the page untouched) when the host is unsupported.
pub fn start<D, S, R>(
    dom: Rc<D>,
    runtime: Rc<R>,
    source: S,
    hostname: &str,
    settings: ViewerSettings,
) -> Option<Rc<DomObserver<D, S, R>>>
where
    D: OverlaySurface + MutationFeed,
    S: ThreadSource,
    R: Runtime,
{
    let Some(platform) = altlens_types::resolve(hostname) else {
        debug!(hostname, "Unsupported host, staying inert");
        return None;
    };
    Some(start_with(dom, runtime, source, platform.clone(), settings))
}

/// Start the engine with an explicit platform configuration.
pub fn start_with<D, S, R>(
    dom: Rc<D>,
    runtime: Rc<R>,
    source: S,
    platform: PlatformConfig,
    settings: ViewerSettings,
) -> Rc<DomObserver<D, S, R>>
where
    D: OverlaySurface + MutationFeed,
    S: ThreadSource,
    R: Runtime,
{
    let settle_delay_ms = settings.settle_delay_ms;
    let settings = Rc::new(settings);
    let processor = PostProcessor::new(
        Rc::clone(&dom),
        Rc::clone(&runtime),
        platform,
        settings,
        source,
    );
    let observer = DomObserver::new(dom, runtime, processor);
    observer.start(settle_delay_ms);
    observer
}
