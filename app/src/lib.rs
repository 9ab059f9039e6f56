//! Browser content-script entry point.
//!
//! Binds the engine to the live page via `web-sys`, injects the overlay
//! stylesheet and keeps the engine alive for the page's lifetime.

mod document;
mod runtime;
pub mod style;

use std::cell::RefCell;
use std::rc::Rc;

use altlens_core::{BskyThreadClient, DomObserver};
use altlens_types::ViewerSettings;
use tracing::{Level, debug, warn};
use wasm_bindgen::prelude::*;

pub use document::{WebDocument, WebOverlay};
pub use runtime::WebRuntime;

type Engine = Rc<DomObserver<WebDocument, BskyThreadClient, WebRuntime>>;

thread_local! {
    static ENGINE: RefCell<Option<Engine>> = const { RefCell::new(None) };
}

#[wasm_bindgen(start)]
pub fn run() {
    console_error_panic_hook::set_once();
    let _ = dioxus_logger::init(Level::INFO);

    let Some(window) = web_sys::window() else {
        return;
    };
    let hostname = window.location().hostname().unwrap_or_default();
    let Some(dom) = WebDocument::new(window) else {
        debug!("No document, not starting");
        return;
    };
    let dom = Rc::new(dom);

    let settings = ViewerSettings::default();
    let source = BskyThreadClient::new(&settings);
    let Some(engine) = altlens_core::start(
        Rc::clone(&dom),
        Rc::new(WebRuntime),
        source,
        &hostname,
        settings,
    ) else {
        return;
    };

    if let Err(e) = style::inject(dom.document()) {
        warn!(error = ?e, "Failed to inject overlay stylesheet");
    }
    ENGINE.with(|slot| *slot.borrow_mut() = Some(engine));
}
