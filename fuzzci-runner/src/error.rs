//! Error types for the runner crate.

use std::path::PathBuf;

/// Errors that abort a fuzzing run.
///
/// The "no corpus yet" storage condition never reaches this type; the
/// fetcher absorbs it.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// Invalid configuration value.
    #[error("settings: {0}")]
    Settings(#[from] fuzzci_core::CoreError),

    /// An object storage error other than a missing corpus.
    #[error("storage error: {0}")]
    Storage(#[from] fuzzci_storage::StorageError),

    /// Image pull or container run failed to start.
    #[error("executor error: {0}")]
    Executor(#[from] fuzzci_executor::ExecutorError),

    /// A zip archive could not be read or written.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// A seed archive entry would be written outside its target directory.
    #[error("unsafe entry '{entry}' in archive {}", archive.display())]
    UnsafeArchiveEntry { archive: PathBuf, entry: String },

    /// The run summary could not be serialized.
    #[error("run summary: {0}")]
    Summary(#[from] serde_json::Error),

    /// A blocking worker task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Underlying I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
