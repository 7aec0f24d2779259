//! Error types for the executor crate.

use std::path::PathBuf;

/// Errors that can occur while preparing or running the fuzz container.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ExecutorError {
    /// Container runtime binary not found at the configured path or in `PATH`.
    #[error("container runtime binary not found at {}", path.display())]
    BinaryNotFound { path: PathBuf },

    /// The run process could not be started.
    #[error("run spawn failed: {0}")]
    SpawnFailed(String),

    /// Pulling the runner image failed.
    #[error("pull of image {image} failed: {reason}")]
    PullFailed { image: String, reason: String },

    /// The image manifest could not be parsed.
    #[error("invalid image manifest {}: {reason}", path.display())]
    InvalidImageManifest { path: PathBuf, reason: String },

    /// Underlying I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
