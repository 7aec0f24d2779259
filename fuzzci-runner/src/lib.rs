//! libFuzzer CI orchestration.
//!
//! Downloads fuzz targets listed in build reports, restores each target's
//! historical corpus, runs the libFuzzer runner container with environment
//! derived from the check name, and publishes the evolved corpus after a
//! successful run.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod archive;
pub mod error;
pub mod fetch;
pub mod fuzzers;
pub mod pipeline;
pub mod publish;
pub mod settings;

pub use error::PipelineError;
pub use fetch::{CorpusFetcher, SyncReport};
pub use pipeline::{Pipeline, RunOutcome};
pub use publish::{CorpusPublisher, PublishReport};
pub use settings::Settings;
