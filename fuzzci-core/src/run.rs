use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Terminal state of the run executor.
///
/// Drives the conditional publish step: the corpus is uploaded if and only
/// if [`RunResult::is_success`] holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct RunResult {
    /// Process exit code, or `None` if it was terminated by a signal.
    pub exit_code: Option<i32>,
    /// File holding the raw combined output of the run.
    pub log_path: PathBuf,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

impl RunResult {
    /// Create a new run result.
    #[must_use]
    pub fn new(exit_code: Option<i32>, log_path: PathBuf, elapsed: Duration) -> Self {
        Self {
            exit_code,
            log_path,
            elapsed,
        }
    }

    /// `true` only for an exit code of exactly zero.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Workflow states, in order of progression.
///
/// `Init -> Configuring -> FetchingCorpus -> Running -> {Publishing | Skipped} -> Done`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum RunState {
    /// Nothing has happened yet.
    Init,
    /// Resolving settings, image, and container environment.
    Configuring,
    /// Downloading fuzzers and restoring corpora.
    FetchingCorpus,
    /// The container is running.
    Running,
    /// Archiving and uploading the corpus after a successful run.
    Publishing,
    /// The run failed; object storage is left untouched.
    Skipped,
    /// Terminal.
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::Configuring => "configuring",
            Self::FetchingCorpus => "fetching_corpus",
            Self::Running => "running",
            Self::Publishing => "publishing",
            Self::Skipped => "skipped",
            Self::Done => "done",
        };
        f.write_str(s)
    }
}
