//! Task and timer scheduling.
//!
//! The engine is single-threaded: tasks are `!Send` local futures and timer
//! callbacks run on the same thread as DOM events. The browser binding
//! implements [`Runtime`] on `spawn_local` + `gloo-timers`; native builds and
//! tests use [`TokioRuntime`] inside a `LocalSet`.

use std::future::Future;
use std::pin::Pin;

/// A boxed, non-`Send` future.
pub type LocalBoxFuture<T> = Pin<Box<dyn Future<Output = T>>>;

/// A spawned background task.
pub type LocalTask = LocalBoxFuture<()>;

pub trait Runtime: 'static {
    /// Run `task` to completion in the background.
    fn spawn(&self, task: LocalTask);

    /// Invoke `callback` once after `delay_ms`.
    fn schedule(&self, delay_ms: u32, callback: Box<dyn FnOnce()>);
}

/// Runtime backed by tokio's local task set.
///
/// Must be used from within a `tokio::task::LocalSet`.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioRuntime;

#[cfg(not(target_arch = "wasm32"))]
impl Runtime for TokioRuntime {
    fn spawn(&self, task: LocalTask) {
        tokio::task::spawn_local(task);
    }

    fn schedule(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) {
        tokio::task::spawn_local(async move {
            tokio::time::sleep(std::time::Duration::from_millis(delay_ms as u64)).await;
            callback();
        });
    }
}
