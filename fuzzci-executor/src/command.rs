//! Container invocation for the libFuzzer runner.
//!
//! The built command is an opaque shell string handed unchanged to the
//! executor. The container runs without the default seccomp profile and with
//! `SYS_PTRACE`: the runner issues `io_uring` syscalls.

use std::path::{Path, PathBuf};

use fuzzci_core::RunConfiguration;

use crate::DockerImage;

/// Working directory and fuzzer mount inside the container.
pub const CONTAINER_FUZZERS_DIR: &str = "/fuzzers";

/// Mount point of the repository's `tests/` tree inside the container.
pub const CONTAINER_TEST_DIR: &str = "/usr/share/clickhouse-test";

/// Mount point of the result directory inside the container.
pub const CONTAINER_OUTPUT_DIR: &str = "/test_output";

/// Runner entry point inside the mounted test tree.
pub const RUNNER_ENTRYPOINT: &str = "python3 /usr/share/clickhouse-test/fuzz/runner.py";

/// Object storage endpoint pinned for the container. Internal endpoint
/// overrides must not leak into fuzzing containers.
pub const PUBLIC_S3_URL: &str = "https://s3.amazonaws.com";

/// Options always passed to the runner.
const BASELINE_RUNNER_OPTIONS: [&str; 2] = ["--hung-check", "--print-time"];

/// Host paths mounted into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct RunPaths {
    /// Directory holding fuzzer binaries and their corpora.
    pub fuzzers: PathBuf,
    /// Repository checkout; its `tests/` directory is mounted.
    pub repo: PathBuf,
    /// Directory the runner writes results and the final corpus to.
    pub result: PathBuf,
}

impl RunPaths {
    /// Create a set of run paths.
    #[must_use]
    pub fn new(fuzzers: PathBuf, repo: PathBuf, result: PathBuf) -> Self {
        Self {
            fuzzers,
            repo,
            result,
        }
    }
}

/// Build the `docker run` command for one fuzzing session.
///
/// `ci_logs_args` is inserted verbatim and may be empty.
#[must_use]
pub fn build_run_command(
    docker: &Path,
    paths: &RunPaths,
    envs: &RunConfiguration,
    ci_logs_args: &str,
    image: &DockerImage,
) -> String {
    let mut env_flags = vec![format!("-e S3_URL=\"{PUBLIC_S3_URL}\"")];
    env_flags.extend(envs.into_iter().map(|e| format!("-e {e}")));

    let options = format!(
        "-e ADDITIONAL_OPTIONS=\"{}\"",
        BASELINE_RUNNER_OPTIONS.join(" ")
    );

    let parts = [
        format!("{} run", docker.display()),
        ci_logs_args.trim().to_owned(),
        format!("--workdir={CONTAINER_FUZZERS_DIR}"),
        format!("--volume={}:{CONTAINER_FUZZERS_DIR}", paths.fuzzers.display()),
        format!("--volume={}:{CONTAINER_TEST_DIR}", paths.repo.join("tests").display()),
        format!("--volume={}:{CONTAINER_OUTPUT_DIR}", paths.result.display()),
        "--security-opt seccomp=unconfined".to_owned(),
        "--cap-add=SYS_PTRACE".to_owned(),
        env_flags.join(" "),
        options,
        image.to_string(),
        RUNNER_ENTRYPOINT.to_owned(),
    ];

    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
