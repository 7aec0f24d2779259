//! CI metadata and the log-export arguments derived from it.
//!
//! The container can push its server logs to an external CI logs cluster.
//! When credentials are configured, the run command gets a mounted
//! credentials file and an expression tagging every exported row with the
//! pull request, commit, check start time and check name.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ExecutorError;

/// Where the credentials file is mounted inside the container.
pub const CONTAINER_LOGS_CONFIG: &str = "/tmp/export-logs-config.sh";

/// Default user for the CI logs cluster.
pub const DEFAULT_CI_LOGS_USER: &str = "ci";

/// Pull request the run belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct PrInfo {
    /// PR number, `0` for pushes to a branch.
    pub number: u64,
    /// Head commit SHA.
    pub sha: String,
}

impl PrInfo {
    /// Create PR info.
    pub fn new(number: u64, sha: impl Into<String>) -> Self {
        Self {
            number,
            sha: sha.into(),
        }
    }
}

/// Run start time: wall clock for reporting plus a monotonic instant for
/// elapsed time.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started_at: DateTime<Utc>,
    started: Instant,
}

impl Stopwatch {
    /// Start a stopwatch now.
    #[must_use]
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    /// Wall-clock start time.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Start time as `YYYY-MM-DD HH:MM:SS` in UTC.
    #[must_use]
    pub fn start_time_str(&self) -> String {
        self.started_at.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Monotonic time since start.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::start()
    }
}

/// Credentials for the CI logs cluster.
///
/// An empty host disables log export entirely.
#[derive(Clone)]
pub struct CiLogsCredentials {
    config_path: PathBuf,
    host: String,
    user: String,
    password: String,
    instance_type: String,
    instance_id: String,
}

impl std::fmt::Debug for CiLogsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CiLogsCredentials")
            .field("config_path", &self.config_path)
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"***")
            .finish_non_exhaustive()
    }
}

impl CiLogsCredentials {
    /// Create credentials that will be written to `config_path`.
    pub fn new(
        config_path: PathBuf,
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            config_path,
            host: host.into(),
            user: user.into(),
            password: password.into(),
            instance_type: String::new(),
            instance_id: String::new(),
        }
    }

    /// Attach the CI worker's instance type and id to exported rows.
    #[must_use]
    pub fn with_instance(
        mut self,
        instance_type: impl Into<String>,
        instance_id: impl Into<String>,
    ) -> Self {
        self.instance_type = instance_type.into();
        self.instance_id = instance_id.into();
        self
    }

    /// Whether log export is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.host.is_empty()
    }

    /// The secret, for masking it in logged commands.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Write the credentials file and return the extra `docker run`
    /// arguments, or an empty string when export is disabled.
    ///
    /// # Errors
    /// Returns [`ExecutorError::Io`] if the credentials file cannot be written.
    pub async fn docker_arguments(
        &self,
        pr_info: &PrInfo,
        check_start_time: &str,
        check_name: &str,
    ) -> Result<String, ExecutorError> {
        if !self.is_enabled() {
            tracing::info!("CI logs host not configured, log export disabled");
            return Ok(String::new());
        }

        self.write_config().await?;

        let extra_columns = format!(
            "CAST({} AS UInt32) AS pull_request_number, '{}' AS commit_sha, \
             toDateTime('{check_start_time}', 'UTC') AS check_start_time, \
             toLowCardinality('{}') AS check_name, \
             toLowCardinality('{}') AS instance_type, '{}' AS instance_id",
            pr_info.number,
            sql_literal(&pr_info.sha),
            sql_literal(check_name),
            sql_literal(&self.instance_type),
            sql_literal(&self.instance_id),
        );

        Ok(format!(
            "-e EXTRA_COLUMNS_EXPRESSION=\"{extra_columns}\" \
             -e CLICKHOUSE_CI_LOGS_CREDENTIALS={CONTAINER_LOGS_CONFIG} \
             --volume={}:{CONTAINER_LOGS_CONFIG}:ro",
            absolute(&self.config_path).display()
        ))
    }

    async fn write_config(&self) -> Result<(), ExecutorError> {
        if let Some(parent) = self.config_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = format!(
            "CLICKHOUSE_CI_LOGS_HOST={}\n\
             CLICKHOUSE_CI_LOGS_USER={}\n\
             CLICKHOUSE_CI_LOGS_PASSWORD={}\n",
            self.host, self.user, self.password
        );
        tokio::fs::write(&self.config_path, contents).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.config_path, std::fs::Permissions::from_mode(0o600))
                .await?;
        }

        tracing::debug!(path = %self.config_path.display(), "wrote CI logs credentials");
        Ok(())
    }
}

/// Escape a value for a single-quoted SQL literal inside a double-quoted
/// shell word.
fn sql_literal(value: &str) -> String {
    value.replace('\'', "''").replace('"', "\\\"")
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_owned();
    }
    std::env::current_dir().map_or_else(|_| path.to_owned(), |cwd| cwd.join(path))
}
