//! Environment-derived settings and the run's on-disk layout.

use std::path::PathBuf;

use fuzzci_core::config::{RUN_BY_HASH_NUM, RUN_BY_HASH_TOTAL};
use fuzzci_core::ShardSpec;
use fuzzci_executor::ci_logs::DEFAULT_CI_LOGS_USER;
use fuzzci_executor::{CiLogsCredentials, PrInfo};

use crate::PipelineError;

/// Bucket holding build artifacts and fuzzing corpora.
pub const DEFAULT_BUILDS_BUCKET: &str = "clickhouse-builds";

/// Everything the pipeline reads from the environment.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Settings {
    /// Per-run scratch directory.
    pub temp_path: PathBuf,
    /// Directory holding build reports and the image manifest.
    pub reports_path: PathBuf,
    /// Repository checkout.
    pub repo_path: PathBuf,
    /// Bucket for fuzzers and corpora.
    pub bucket: String,
    /// Root of the filesystem object store.
    pub storage_root: PathBuf,
    /// Sharding of this check.
    pub shard: ShardSpec,
    /// Container runtime CLI.
    pub docker: PathBuf,
    /// Pull request metadata.
    pub pr_info: PrInfo,
    /// CI logs cluster host; empty disables log export.
    pub ci_logs_host: String,
    /// CI logs cluster user.
    pub ci_logs_user: String,
    /// CI logs cluster password.
    pub ci_logs_password: String,
    /// CI worker instance type.
    pub instance_type: String,
    /// CI worker instance id.
    pub instance_id: String,
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// # Errors
    /// See [`Settings::from_lookup`].
    pub fn from_env() -> Result<Self, PipelineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    ///
    /// # Errors
    /// Returns [`PipelineError::Settings`] if the sharding variables or the
    /// PR number are not integers.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PipelineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        let temp_path = PathBuf::from(get("TEMP_PATH", "./tmp"));
        let storage_root = lookup("FUZZCI_STORAGE_ROOT")
            .map_or_else(|| temp_path.join("object-store"), PathBuf::from);

        let num = lookup(RUN_BY_HASH_NUM);
        let total = lookup(RUN_BY_HASH_TOTAL);
        let shard = ShardSpec::from_env_values(num.as_deref(), total.as_deref())?;

        let pr_raw = get("PR_NUMBER", "0");
        let pr_number = pr_raw.trim().parse().map_err(|_| {
            PipelineError::Settings(fuzzci_core::CoreError::InvalidInteger {
                var: "PR_NUMBER",
                value: pr_raw.clone(),
            })
        })?;

        Ok(Self {
            reports_path: PathBuf::from(get("REPORT_PATH", "./reports")),
            repo_path: PathBuf::from(get("REPO_COPY", ".")),
            bucket: get("S3_BUILDS_BUCKET", DEFAULT_BUILDS_BUCKET),
            storage_root,
            shard,
            docker: PathBuf::from(get("FUZZCI_DOCKER", "docker")),
            pr_info: PrInfo::new(pr_number, get("GITHUB_SHA", "")),
            ci_logs_host: get("CLICKHOUSE_CI_LOGS_HOST", ""),
            ci_logs_user: get("CLICKHOUSE_CI_LOGS_USER", DEFAULT_CI_LOGS_USER),
            ci_logs_password: get("CLICKHOUSE_CI_LOGS_PASSWORD", ""),
            instance_type: get("INSTANCE_TYPE", ""),
            instance_id: get("INSTANCE_ID", ""),
            temp_path,
        })
    }

    /// `<temp>/fuzzers`: binaries plus per-target `.corpus` and `.in` dirs.
    #[must_use]
    pub fn fuzzers_path(&self) -> PathBuf {
        self.temp_path.join("fuzzers")
    }

    /// `<temp>/result_path`: run log, final corpus, corpus archive.
    #[must_use]
    pub fn result_path(&self) -> PathBuf {
        self.temp_path.join("result_path")
    }

    /// `<result>/run.log`.
    #[must_use]
    pub fn run_log_path(&self) -> PathBuf {
        self.result_path().join("run.log")
    }

    /// CI logs credentials, written under the temp directory on use.
    #[must_use]
    pub fn ci_logs_credentials(&self) -> CiLogsCredentials {
        CiLogsCredentials::new(
            self.temp_path.join("export-logs-config.sh"),
            self.ci_logs_host.clone(),
            self.ci_logs_user.clone(),
            self.ci_logs_password.clone(),
        )
        .with_instance(self.instance_type.clone(), self.instance_id.clone())
    }
}
