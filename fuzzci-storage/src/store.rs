//! Object store abstraction trait.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::StorageError;

/// Object storage client.
///
/// Implementations must be `Send + Sync` so a single instance can be shared
/// by the whole pipeline.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Download every object under `prefix` whose key ends with `suffix` into
    /// `local_dir`, preserving the key path relative to the prefix.
    ///
    /// Returns the local paths written.
    ///
    /// # Errors
    /// Returns [`StorageError::NoSuchKey`] if nothing exists under `prefix`.
    async fn download_files(
        &self,
        bucket: &str,
        prefix: &str,
        suffix: &str,
        local_dir: &Path,
    ) -> Result<Vec<PathBuf>, StorageError>;

    /// Download a single object to `local_path`.
    ///
    /// # Errors
    /// Returns [`StorageError::NoSuchKey`] if the object does not exist.
    async fn download_file(
        &self,
        bucket: &str,
        key: &str,
        local_path: &Path,
    ) -> Result<(), StorageError>;

    /// Upload `local_path` to `key`, replacing any existing object.
    ///
    /// # Errors
    /// Returns [`StorageError::LocalFileNotFound`] if `local_path` is missing.
    async fn upload_file(
        &self,
        bucket: &str,
        local_path: &Path,
        key: &str,
    ) -> Result<(), StorageError>;
}
