//! Error types for the engine.
//!
//! Nothing here is fatal: every error is logged and degrades to "no overlay"
//! for the one container it concerns.

use thiserror::Error;

/// Why a remote alt text lookup produced nothing.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no post identifier on any ancestor")]
    MissingPostId,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("response carries no alt text")]
    NoAltText,

    /// Failures raised by non-HTTP sources.
    #[error("{0}")]
    Source(String),
}

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable")]
    Unavailable,

    #[error("clipboard write rejected: {0}")]
    Rejected(String),
}
