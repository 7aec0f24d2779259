//! Docker container runtime implementation.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use fuzzci_core::RunResult;
use tokio::process::Command;

use crate::backend::ContainerRuntime;
use crate::{tee, DockerImage, ExecutorError};

/// Docker-backed runtime. Runs are executed through the tee executor.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    /// Path to the `docker` binary, or a bare name looked up in `PATH`.
    binary_path: PathBuf,
}

impl DockerRuntime {
    /// Create a runtime using the given CLI binary.
    #[must_use]
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Create a runtime that looks up `docker` in `PATH`.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(PathBuf::from("docker"))
    }

    /// Check that the CLI binary can be found.
    ///
    /// # Errors
    /// Returns [`ExecutorError::BinaryNotFound`] if it cannot.
    pub fn health_check(&self) -> Result<(), ExecutorError> {
        which_binary(&self.binary_path)
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn pull(&self, image: &DockerImage) -> Result<(), ExecutorError> {
        which_binary(&self.binary_path)?;

        tracing::info!(image = %image, "pulling runner image");

        let output = Command::new(&self.binary_path)
            .arg("pull")
            .arg(image.to_string())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ExecutorError::PullFailed {
                image: image.to_string(),
                reason: format!("exec {}: {e}", self.binary_path.display()),
            })?;

        if !output.status.success() {
            return Err(ExecutorError::PullFailed {
                image: image.to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        tracing::info!(image = %image, "runner image ready");
        Ok(())
    }

    async fn run(&self, command: &str, log_path: &Path) -> Result<RunResult, ExecutorError> {
        tee::execute(command, log_path).await
    }

    fn binary(&self) -> &Path {
        &self.binary_path
    }
}

/// Verify a binary exists either at the given path or in PATH.
fn which_binary(path: &Path) -> Result<(), ExecutorError> {
    if path.components().count() > 1 || path.is_absolute() {
        if path.exists() {
            return Ok(());
        }
        return Err(ExecutorError::BinaryNotFound { path: path.to_owned() });
    }

    let found = std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(path).exists()))
        .unwrap_or(false);

    if found {
        Ok(())
    } else {
        Err(ExecutorError::BinaryNotFound { path: path.to_owned() })
    }
}
