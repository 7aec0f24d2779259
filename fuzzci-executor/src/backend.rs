//! Container runtime abstraction trait.
//!
//! Lets the pipeline run against Docker in CI and against fakes in tests
//! without changing the orchestration logic.

use std::path::Path;

use async_trait::async_trait;
use fuzzci_core::RunResult;

use crate::{DockerImage, ExecutorError};

/// Container runtime used to host the libFuzzer runner.
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Make `image` available locally.
    ///
    /// # Errors
    /// Returns [`ExecutorError::PullFailed`] if the image cannot be fetched.
    async fn pull(&self, image: &DockerImage) -> Result<(), ExecutorError>;

    /// Run `command` to completion, persisting its combined output to
    /// `log_path`.
    ///
    /// A non-zero exit is not an error; it is reported in the [`RunResult`].
    ///
    /// # Errors
    /// Returns [`ExecutorError::SpawnFailed`] if the command cannot start.
    async fn run(&self, command: &str, log_path: &Path) -> Result<RunResult, ExecutorError>;

    /// Path or name of the runtime's CLI, used to build run commands.
    fn binary(&self) -> &Path;
}
