//! Entry point for the `fuzzci-runner` CLI.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fuzzci_executor::image::DEFAULT_RUNNER_IMAGE;
use fuzzci_executor::DockerRuntime;
use fuzzci_runner::{Pipeline, Settings};
use fuzzci_storage::LocalObjectStore;

/// Run libFuzzer targets for one CI check and publish the evolved corpus.
#[derive(Debug, Parser)]
#[command(name = "fuzzci-runner", version, about)]
struct Cli {
    /// CI check name; selects feature toggles passed to the runner.
    check_name: String,

    /// Exit with status 1 when the fuzzing run fails.
    #[arg(long)]
    strict_exit: bool,

    /// Runner image name, resolved against `changed_images.json`.
    #[arg(long, default_value = DEFAULT_RUNNER_IMAGE)]
    image: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "invalid settings");
            std::process::exit(1);
        }
    };

    let store = LocalObjectStore::new(settings.storage_root.clone());
    let runtime = DockerRuntime::new(settings.docker.clone());
    if let Err(e) = runtime.health_check() {
        tracing::error!(error = %e, "container runtime unavailable");
        std::process::exit(1);
    }
    let pipeline = Pipeline::new(store, runtime, settings, cli.image);

    let outcome = match pipeline.run(&cli.check_name).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "fuzzing pipeline failed");
            std::process::exit(1);
        }
    };

    if outcome.result.is_success() {
        tracing::info!(run_id = %outcome.run_id, "fuzzing run complete");
    } else {
        tracing::warn!(
            run_id = %outcome.run_id,
            exit_code = ?outcome.result.exit_code,
            "fuzzing run failed"
        );
        if cli.strict_exit {
            std::process::exit(1);
        }
    }
}
