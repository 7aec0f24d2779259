//! Filesystem-backed object store.
//!
//! Each bucket is a directory under the store root and each key a relative
//! file path inside it. Useful for mounted buckets and for local runs.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::store::ObjectStore;
use crate::StorageError;

/// Object store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Create a store rooted at `root`. The directory need not exist yet.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// The directory backing this store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(bucket)?;
        validate_key(key)?;
        Ok(self.root.join(bucket).join(key.trim_end_matches('/')))
    }
}

/// Reject keys that are absolute or climb out of the bucket.
fn validate_key(key: &str) -> Result<(), StorageError> {
    let escapes = Path::new(key)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if key.is_empty() || escapes {
        return Err(StorageError::InvalidKey(key.to_owned()));
    }
    Ok(())
}

/// List regular files below `dir` as paths relative to it, sorted.
fn list_relative_files(dir: &Path) -> Result<Vec<PathBuf>, StorageError> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| StorageError::Io(std::io::Error::other(e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(dir) {
            files.push(relative.to_path_buf());
        }
    }
    Ok(files)
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn download_files(
        &self,
        bucket: &str,
        prefix: &str,
        suffix: &str,
        local_dir: &Path,
    ) -> Result<Vec<PathBuf>, StorageError> {
        let source = self.object_path(bucket, prefix)?;
        if !tokio::fs::metadata(&source).await.is_ok_and(|m| m.is_dir()) {
            return Err(StorageError::NoSuchKey {
                bucket: bucket.to_owned(),
                key: prefix.to_owned(),
            });
        }

        let listing_root = source.clone();
        let relative_files = tokio::task::spawn_blocking(move || list_relative_files(&listing_root))
            .await
            .map_err(|e| StorageError::Io(std::io::Error::other(e)))??;

        tokio::fs::create_dir_all(local_dir).await?;

        let mut written = Vec::with_capacity(relative_files.len());
        for relative in relative_files {
            if !relative.to_string_lossy().ends_with(suffix) {
                continue;
            }
            let destination = local_dir.join(&relative);
            if let Some(parent) = destination.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::copy(source.join(&relative), &destination).await?;
            written.push(destination);
        }

        tracing::debug!(
            bucket,
            prefix,
            count = written.len(),
            "downloaded objects from local store"
        );

        Ok(written)
    }

    async fn download_file(
        &self,
        bucket: &str,
        key: &str,
        local_path: &Path,
    ) -> Result<(), StorageError> {
        let source = self.object_path(bucket, key)?;
        if !tokio::fs::metadata(&source).await.is_ok_and(|m| m.is_file()) {
            return Err(StorageError::NoSuchKey {
                bucket: bucket.to_owned(),
                key: key.to_owned(),
            });
        }
        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(&source, local_path).await?;
        Ok(())
    }

    async fn upload_file(
        &self,
        bucket: &str,
        local_path: &Path,
        key: &str,
    ) -> Result<(), StorageError> {
        if !tokio::fs::metadata(local_path).await.is_ok_and(|m| m.is_file()) {
            return Err(StorageError::LocalFileNotFound {
                path: local_path.to_owned(),
            });
        }
        let destination = self.object_path(bucket, key)?;
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Copy then rename so readers never see a half-written object.
        let staging = destination.with_extension("upload-tmp");
        tokio::fs::copy(local_path, &staging).await?;
        tokio::fs::rename(&staging, &destination).await?;

        tracing::debug!(bucket, key, "uploaded object to local store");

        Ok(())
    }
}
