//! Error types for the riff fetch pipeline.

use thiserror::Error;

/// Errors surfaced by pipeline setup and resolver/decode plumbing.
///
/// Per-stem decode failures are not represented here: a stem that fails
/// to decode becomes a `failed` [`riffwork_core::Stem`] rather than an
/// error, so a single bad stem never aborts a riff resolve.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The worker thread has already shut down; further requests are refused.
    #[error("pipeline worker has shut down")]
    WorkerGone,

    /// A resolver's underlying network client failed.
    #[error("network resolver error: {0}")]
    Network(#[from] reqwest::Error),

    /// Local disk cache I/O failed.
    #[error("disk cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
