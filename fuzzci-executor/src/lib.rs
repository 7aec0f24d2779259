//! Container execution for the fuzzci pipeline.
//!
//! Builds the `docker run` invocation for the libFuzzer runner, executes it
//! with tee semantics, and derives the CI log-export arguments.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod backend;
pub mod ci_logs;
pub mod command;
pub mod docker;
pub mod error;
pub mod image;
pub mod tee;

pub use backend::ContainerRuntime;
pub use ci_logs::{CiLogsCredentials, PrInfo, Stopwatch};
pub use command::{build_run_command, RunPaths};
pub use docker::DockerRuntime;
pub use error::ExecutorError;
pub use image::DockerImage;
