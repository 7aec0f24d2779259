//! Remote key layout for fuzzing data.

/// Key the consolidated corpus archive is uploaded to, overwritten each run.
pub const CORPUS_ARCHIVE_KEY: &str = "fuzzer/corpus.zip";

/// Prefix under which one target's historical corpus units live.
#[must_use]
pub fn corpus_prefix(target: &str) -> String {
    format!("fuzzer/corpus/{target}/")
}
