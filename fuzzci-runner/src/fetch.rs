//! Corpus fetcher: prepares every discovered fuzz artifact for the run.
//!
//! Fuzz targets are made executable and get their historical corpus
//! restored from object storage into `<target>.corpus`. Seed archives are
//! extracted into `<target>.in`. A target that never had a corpus is not an
//! error. Entries are processed one at a time in name order so the CI log
//! reads deterministically.

use std::path::{Path, PathBuf};

use fuzzci_core::{ArtifactKind, FuzzArtifact};
use fuzzci_storage::{corpus_prefix, ObjectStore};

use crate::archive::extract_zip;
use crate::PipelineError;

/// What a [`CorpusFetcher::sync`] pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct SyncReport {
    /// Fuzz targets found and made executable.
    pub targets: Vec<String>,
    /// Historical corpus units restored across all targets.
    pub units: usize,
    /// Targets with no corpus in object storage yet.
    pub without_corpus: Vec<String>,
    /// Seed directories populated from archives.
    pub seed_dirs: Vec<PathBuf>,
}

/// Restores corpora for the artifacts in a fuzzer directory.
pub struct CorpusFetcher<'a, S: ObjectStore> {
    store: &'a S,
    bucket: &'a str,
}

impl<'a, S: ObjectStore> CorpusFetcher<'a, S> {
    /// Create a fetcher reading from `bucket` through `store`.
    #[must_use]
    pub fn new(store: &'a S, bucket: &'a str) -> Self {
        Self { store, bucket }
    }

    /// Process every artifact in `fuzzers_dir`.
    ///
    /// # Errors
    /// Any storage error other than "no such key" aborts the pass, as do
    /// filesystem and archive errors.
    pub async fn sync(&self, fuzzers_dir: &Path) -> Result<SyncReport, PipelineError> {
        let mut report = SyncReport::default();

        for artifact in discover(fuzzers_dir).await? {
            match artifact.kind {
                ArtifactKind::Binary => {
                    make_executable(&artifact.path).await?;
                    let target = artifact.target_name().to_owned();
                    match self.download_corpus(&artifact).await? {
                        Some(units) => report.units += units,
                        None => report.without_corpus.push(target.clone()),
                    }
                    report.targets.push(target);
                }
                ArtifactKind::SeedArchive => {
                    let dest = artifact.corpus_dir();
                    let archive = artifact.path.clone();
                    let unpack_to = dest.clone();
                    let files =
                        tokio::task::spawn_blocking(move || extract_zip(&archive, &unpack_to))
                            .await??;
                    tracing::info!(
                        fuzzer = artifact.target_name(),
                        files,
                        dir = %dest.display(),
                        "extracted seed corpus"
                    );
                    report.seed_dirs.push(dest);
                }
            }
        }

        Ok(report)
    }

    /// Download one target's historical corpus. Returns `None` when object
    /// storage has no corpus for it.
    async fn download_corpus(
        &self,
        artifact: &FuzzArtifact,
    ) -> Result<Option<usize>, PipelineError> {
        let fuzzer = artifact.target_name();
        tracing::info!(fuzzer, "downloading corpus");

        let prefix = corpus_prefix(fuzzer);
        match self
            .store
            .download_files(self.bucket, &prefix, "", &artifact.corpus_dir())
            .await
        {
            Ok(units) => {
                tracing::info!(fuzzer, units = units.len(), "corpus downloaded");
                Ok(Some(units.len()))
            }
            Err(e) if e.is_no_such_key() => {
                tracing::debug!(fuzzer, "no active corpus exists");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// List the artifacts in `dir`, sorted by file name.
///
/// Entries whose names are not valid UTF-8 cannot match any suffix and are
/// skipped.
///
/// # Errors
/// Returns [`PipelineError::Io`] if the directory cannot be read.
pub async fn discover(dir: &Path) -> Result<Vec<FuzzArtifact>, PipelineError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut artifacts = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            tracing::debug!(entry = ?file_name, "skipping non UTF-8 file name");
            continue;
        };
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if let Some(artifact) = FuzzArtifact::classify(dir, name) {
            artifacts.push(artifact);
        }
    }
    artifacts.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(artifacts)
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> Result<(), PipelineError> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o777)).await?;
    Ok(())
}

#[cfg(not(unix))]
#[allow(clippy::unused_async)]
async fn make_executable(_path: &Path) -> Result<(), PipelineError> {
    Ok(())
}
