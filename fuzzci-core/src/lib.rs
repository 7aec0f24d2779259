//! Core types for the fuzzci corpus orchestration pipeline.
//!
//! Defines fuzz artifacts, the check-name driven run configuration, and the
//! run result that gates corpus publishing. Nothing here performs I/O.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod artifact;
pub mod config;
pub mod error;
pub mod id;
pub mod run;

pub use artifact::{is_fuzzer_payload, ArtifactKind, FuzzArtifact};
pub use config::{resolve, EnvAssignment, RunConfiguration, ShardSpec};
pub use error::CoreError;
pub use id::RunId;
pub use run::{RunResult, RunState};

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;

    #[test]
    fn run_result_success_requires_exact_zero() {
        let log = PathBuf::from("/tmp/run.log");
        let ok = RunResult::new(Some(0), log.clone(), Duration::from_secs(1));
        assert!(ok.is_success(), "exit code 0 must be a success");

        let failed = RunResult::new(Some(1), log.clone(), Duration::from_secs(1));
        assert!(!failed.is_success(), "non-zero exit code must not be a success");

        let negative = RunResult::new(Some(-1), log.clone(), Duration::ZERO);
        assert!(!negative.is_success(), "negative exit code must not be a success");

        let signalled = RunResult::new(None, log, Duration::ZERO);
        assert!(!signalled.is_success(), "missing exit code must not be a success");
    }

    #[test]
    fn run_state_display_is_snake_case() {
        assert_eq!(RunState::FetchingCorpus.to_string(), "fetching_corpus");
        assert_eq!(RunState::Skipped.to_string(), "skipped");
    }

    #[test]
    fn run_id_is_unique() {
        assert_ne!(RunId::new(), RunId::new(), "random run ids must differ");
    }

    #[test]
    fn run_id_displays_as_hyphenated_uuid() {
        let uuid = uuid::Uuid::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef);
        let id = RunId::from(uuid);
        assert_eq!(id.to_string(), "01234567-89ab-cdef-0123-456789abcdef");
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn env_assignment_display_is_name_equals_value() {
        assert_eq!(EnvAssignment::new("USE_OLD_ANALYZER", "1").to_string(), "USE_OLD_ANALYZER=1");
    }

    #[test]
    fn core_error_display_names_variable() {
        let err = CoreError::InvalidInteger { var: "RUN_BY_HASH_NUM", value: "x".to_owned() };
        let msg = err.to_string();
        assert!(msg.contains("RUN_BY_HASH_NUM"), "error must name the variable, got {msg}");
    }
}
