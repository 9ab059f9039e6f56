use altlens_core::{LocalTask, Runtime};
use gloo_timers::callback::Timeout;
use wasm_bindgen_futures::spawn_local;

/// Browser event loop: microtask-driven futures and `setTimeout` timers.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebRuntime;

impl Runtime for WebRuntime {
    fn spawn(&self, task: LocalTask) {
        spawn_local(task);
    }

    fn schedule(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) {
        // fire-and-forget; the timer owns the callback until it runs
        Timeout::new(delay_ms, callback).forget();
    }
}
