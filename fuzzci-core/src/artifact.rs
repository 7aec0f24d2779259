//! Fuzz artifacts discovered in the fuzzer download directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// File name suffix marking an executable fuzz target.
pub const FUZZER_SUFFIX: &str = "_fuzzer";

/// File name suffix marking a seed corpus archive.
pub const SEED_CORPUS_SUFFIX: &str = "_seed_corpus.zip";

/// Suffix of the directory holding a target's restored historical corpus.
pub const CORPUS_DIR_SUFFIX: &str = ".corpus";

/// Suffix of the directory holding a target's extracted seed inputs.
pub const SEED_DIR_SUFFIX: &str = ".in";

/// Every suffix the fuzz runner consumes from a build's artifact list.
pub const FUZZER_PAYLOAD_SUFFIXES: [&str; 4] =
    [FUZZER_SUFFIX, ".dict", ".options", SEED_CORPUS_SUFFIX];

/// What a discovered artifact is. The set is closed: callers match it
/// exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    /// An instrumented fuzz target executable.
    Binary,
    /// A zip archive of curated seed inputs for one target.
    SeedArchive,
}

/// A file in the fuzzer directory that the corpus fetcher acts on.
///
/// Artifacts are discovered once per run and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct FuzzArtifact {
    /// File name as found on disk.
    pub name: String,
    /// Full local path of the file.
    pub path: PathBuf,
    /// Binary or seed archive.
    pub kind: ArtifactKind,
}

impl FuzzArtifact {
    /// Classify a directory entry by its file name.
    ///
    /// Returns `None` for files the fetcher ignores (dictionaries, options,
    /// anything else). The fuzz target suffix is checked first.
    #[must_use]
    pub fn classify(dir: &Path, file_name: &str) -> Option<Self> {
        let kind = if file_name.ends_with(FUZZER_SUFFIX) {
            ArtifactKind::Binary
        } else if file_name.ends_with(SEED_CORPUS_SUFFIX) {
            ArtifactKind::SeedArchive
        } else {
            return None;
        };
        Some(Self {
            name: file_name.to_owned(),
            path: dir.join(file_name),
            kind,
        })
    }

    /// Name of the fuzz target this artifact belongs to.
    ///
    /// For a binary that is the file name itself; for a seed archive it is the
    /// file name with the seed suffix stripped.
    #[must_use]
    pub fn target_name(&self) -> &str {
        match self.kind {
            ArtifactKind::Binary => &self.name,
            ArtifactKind::SeedArchive => self
                .name
                .strip_suffix(SEED_CORPUS_SUFFIX)
                .unwrap_or(&self.name),
        }
    }

    /// Local directory this artifact populates, next to the artifact itself.
    ///
    /// `<dir>/<target>.corpus` for binaries, `<dir>/<target>.in` for seeds.
    #[must_use]
    pub fn corpus_dir(&self) -> PathBuf {
        let suffix = match self.kind {
            ArtifactKind::Binary => CORPUS_DIR_SUFFIX,
            ArtifactKind::SeedArchive => SEED_DIR_SUFFIX,
        };
        let dir = self.path.parent().unwrap_or_else(|| Path::new(""));
        dir.join(format!("{}{suffix}", self.target_name()))
    }
}

/// Whether a build artifact file name is something the fuzz runner needs.
#[must_use]
pub fn is_fuzzer_payload(file_name: &str) -> bool {
    FUZZER_PAYLOAD_SUFFIXES
        .iter()
        .any(|suffix| file_name.ends_with(suffix))
}
