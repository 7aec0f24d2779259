//! Error types for the storage crate.

use std::path::PathBuf;

/// Errors that can occur while talking to object storage.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StorageError {
    /// Nothing exists under the requested key or prefix.
    #[error("no such key: {bucket}/{key}")]
    NoSuchKey { bucket: String, key: String },

    /// The key would resolve outside the bucket.
    #[error("invalid object key '{0}'")]
    InvalidKey(String),

    /// A local file to upload does not exist.
    #[error("local file not found: {}", path.display())]
    LocalFileNotFound { path: PathBuf },

    /// Underlying I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Whether this is the "no such key" condition that callers may tolerate.
    #[must_use]
    pub fn is_no_such_key(&self) -> bool {
        matches!(self, Self::NoSuchKey { .. })
    }
}
