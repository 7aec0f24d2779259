//! Docker image references for the fuzz runner container.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ExecutorError;

/// Image the libFuzzer runner ships in.
pub const DEFAULT_RUNNER_IMAGE: &str = "clickhouse/libfuzzer";

/// Tag used when no manifest pins the image.
pub const DEFAULT_IMAGE_VERSION: &str = "latest";

/// File in the reports directory mapping image names to freshly built tags.
pub const CHANGED_IMAGES_FILE: &str = "changed_images.json";

/// An opaque, fully qualified image reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub struct DockerImage {
    /// Repository name, e.g. `clickhouse/libfuzzer`.
    pub name: String,
    /// Tag.
    pub version: String,
}

impl DockerImage {
    /// Create an image reference.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Resolve `name` against a `changed_images.json` manifest.
    ///
    /// Falls back to [`DEFAULT_IMAGE_VERSION`] if the manifest is absent or
    /// does not mention the image.
    ///
    /// # Errors
    /// Returns [`ExecutorError::InvalidImageManifest`] if the manifest exists
    /// but is not a JSON object of strings.
    pub async fn resolve(name: &str, manifest_path: &Path) -> Result<Self, ExecutorError> {
        let raw = match tokio::fs::read(manifest_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(
                    manifest = %manifest_path.display(),
                    "no image manifest, using default tag"
                );
                return Ok(Self::new(name, DEFAULT_IMAGE_VERSION));
            }
            Err(e) => return Err(e.into()),
        };

        let tags: BTreeMap<String, String> =
            serde_json::from_slice(&raw).map_err(|e| ExecutorError::InvalidImageManifest {
                path: manifest_path.to_owned(),
                reason: e.to_string(),
            })?;

        let version = tags
            .get(name)
            .map_or(DEFAULT_IMAGE_VERSION, String::as_str);
        Ok(Self::new(name, version))
    }
}

impl fmt::Display for DockerImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}
