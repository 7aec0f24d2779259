//! The fuzzing run workflow.
//!
//! `Init -> Configuring -> FetchingCorpus -> Running -> {Publishing | Skipped} -> Done`
//!
//! Nothing is retried. Any error before the container exits aborts the run;
//! a publish failure is fatal too. A failed container run is not an error:
//! it skips publishing and is reported in the [`RunOutcome`].

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::Instrument;

use fuzzci_core::{resolve, RunId, RunResult, RunState};
use fuzzci_executor::{build_run_command, ContainerRuntime, DockerImage, RunPaths, Stopwatch};
use fuzzci_storage::ObjectStore;

use crate::fetch::{CorpusFetcher, SyncReport};
use crate::fuzzers::download_fuzzers;
use crate::publish::{CorpusPublisher, PublishReport};
use crate::settings::Settings;
use crate::PipelineError;

/// File the run summary is written to inside the result directory.
pub const RUN_SUMMARY_FILE: &str = "run_summary.json";

/// Result of a completed workflow.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct RunOutcome {
    /// Identifier of this run, also present in every log line.
    pub run_id: RunId,
    /// Container run result.
    pub result: RunResult,
    /// What the fetcher restored.
    pub sync: SyncReport,
    /// Present if and only if the run succeeded and the corpus was uploaded.
    pub published: Option<PublishReport>,
    /// States visited, in order.
    pub states: Vec<RunState>,
}

/// Persisted summary of a run for downstream report steps.
#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    run_id: RunId,
    check_name: &'a str,
    started_at: DateTime<Utc>,
    exit_code: Option<i32>,
    elapsed_secs: f64,
    published: bool,
}

/// Drives one fuzzing run against an object store and container runtime.
pub struct Pipeline<S: ObjectStore, R: ContainerRuntime> {
    store: S,
    runtime: R,
    settings: Settings,
    image_name: String,
}

impl<S: ObjectStore, R: ContainerRuntime> Pipeline<S, R> {
    /// Create a pipeline.
    ///
    /// # Arguments
    /// - `store`: object storage client for fuzzers and corpora
    /// - `runtime`: container runtime hosting the runner
    /// - `settings`: paths, bucket, sharding, CI metadata
    /// - `image_name`: runner image, resolved against the image manifest
    #[must_use]
    pub fn new(store: S, runtime: R, settings: Settings, image_name: impl Into<String>) -> Self {
        Self {
            store,
            runtime,
            settings,
            image_name: image_name.into(),
        }
    }

    /// Run the whole workflow for `check_name`.
    ///
    /// # Errors
    /// Returns the first [`PipelineError`] hit. A non-zero container exit is
    /// not an error.
    pub async fn run(&self, check_name: &str) -> Result<RunOutcome, PipelineError> {
        let run_id = RunId::new();
        let span = tracing::info_span!("fuzz_run", %run_id, check = check_name);
        self.run_inner(run_id, check_name).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: RunId,
        check_name: &str,
    ) -> Result<RunOutcome, PipelineError> {
        let stopwatch = Stopwatch::start();
        let mut states = vec![RunState::Init];
        let mut advance = |state: RunState| {
            tracing::info!(%state, "pipeline state");
            states.push(state);
        };

        advance(RunState::Configuring);
        let settings = &self.settings;
        tokio::fs::create_dir_all(&settings.temp_path).await?;
        let envs = resolve(check_name, settings.shard);
        tracing::info!(envs = ?envs.to_strings(), "resolved run configuration");

        let manifest = settings
            .reports_path
            .join(fuzzci_executor::image::CHANGED_IMAGES_FILE);
        let image = DockerImage::resolve(&self.image_name, &manifest).await?;
        self.runtime.pull(&image).await?;

        advance(RunState::FetchingCorpus);
        let fuzzers_path = settings.fuzzers_path();
        download_fuzzers(
            &self.store,
            &settings.bucket,
            &settings.reports_path,
            &fuzzers_path,
        )
        .await?;
        let sync = CorpusFetcher::new(&self.store, &settings.bucket)
            .sync(&fuzzers_path)
            .await?;
        tracing::info!(
            targets = sync.targets.len(),
            units = sync.units,
            without_corpus = sync.without_corpus.len(),
            seeds = sync.seed_dirs.len(),
            "corpus sync complete"
        );

        advance(RunState::Running);
        let result_path = settings.result_path();
        tokio::fs::create_dir_all(&result_path).await?;

        let credentials = settings.ci_logs_credentials();
        let ci_logs_args = credentials
            .docker_arguments(&settings.pr_info, &stopwatch.start_time_str(), check_name)
            .await?;

        let paths = RunPaths::new(fuzzers_path, settings.repo_path.clone(), result_path.clone());
        let command =
            build_run_command(self.runtime.binary(), &paths, &envs, &ci_logs_args, &image);
        tracing::info!(
            command = %redact(&command, credentials.password()),
            "going to run libFuzzer tests"
        );

        let result = self.runtime.run(&command, &settings.run_log_path()).await?;

        let published = if result.is_success() {
            advance(RunState::Publishing);
            tracing::info!("run successfully");
            let report = CorpusPublisher::new(&self.store, &settings.bucket)
                .publish(&result_path)
                .await?;
            Some(report)
        } else {
            advance(RunState::Skipped);
            tracing::warn!(exit_code = ?result.exit_code, "run failed, corpus not published");
            None
        };

        write_summary(
            &result_path,
            &RunSummary {
                run_id,
                check_name,
                started_at: stopwatch.started_at(),
                exit_code: result.exit_code,
                elapsed_secs: stopwatch.elapsed().as_secs_f64(),
                published: published.is_some(),
            },
        )
        .await?;

        advance(RunState::Done);

        Ok(RunOutcome {
            run_id,
            result,
            sync,
            published,
            states,
        })
    }
}

async fn write_summary(result_path: &Path, summary: &RunSummary<'_>) -> Result<(), PipelineError> {
    let json = serde_json::to_vec_pretty(summary)?;
    tokio::fs::write(result_path.join(RUN_SUMMARY_FILE), json).await?;
    Ok(())
}

/// Replace every occurrence of `secret` in `text` with `***`.
fn redact(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        return text.to_owned();
    }
    text.replace(secret, "***")
}
