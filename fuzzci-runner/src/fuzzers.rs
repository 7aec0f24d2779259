//! Fuzzer artifact download driven by build reports.
//!
//! The build job leaves JSON reports listing the URLs of everything it
//! uploaded. Only the files the fuzz runner consumes are fetched.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use fuzzci_core::is_fuzzer_payload;
use fuzzci_storage::ObjectStore;

use crate::PipelineError;

/// The part of a build report the runner reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BuildReport {
    /// Name of the build configuration.
    #[serde(default)]
    pub build_name: String,
    /// Every artifact URL the build uploaded.
    pub build_urls: Vec<String>,
}

impl BuildReport {
    /// Parse a report from JSON bytes.
    ///
    /// # Errors
    /// Returns the serde error if the bytes are not a build report.
    pub fn from_slice(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }

    /// URLs of fuzz targets, dictionaries, options and seed archives.
    pub fn fuzzer_urls(&self) -> impl Iterator<Item = &str> {
        self.build_urls
            .iter()
            .map(String::as_str)
            .filter(|url| file_name(url).is_some_and(is_fuzzer_payload))
    }
}

/// Last path segment of a URL or key.
#[must_use]
pub fn file_name(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().filter(|name| !name.is_empty())
}

/// Map an artifact URL to an object key in `bucket`.
///
/// The scheme and host are dropped, as is a leading `<bucket>/` segment for
/// path-style URLs. Bare keys pass through.
#[must_use]
pub fn url_to_key(url: &str, bucket: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let path = match without_query.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map_or("", |(_, path)| path),
        None => without_query,
    };
    let path = path.trim_start_matches('/');
    path.strip_prefix(bucket)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(path)
        .trim_start_matches('/')
        .to_owned()
}

/// Read every build report in `reports_dir` and download the fuzzer
/// artifacts they list into `fuzzers_dir`.
///
/// Files that are not build reports are skipped. Artifacts are fetched once
/// per file name, first report wins. Returns the local paths written.
///
/// # Errors
/// Storage errors (including a listed artifact that does not exist) and
/// filesystem errors are returned.
pub async fn download_fuzzers<S: ObjectStore>(
    store: &S,
    bucket: &str,
    reports_dir: &Path,
    fuzzers_dir: &Path,
) -> Result<Vec<PathBuf>, PipelineError> {
    tokio::fs::create_dir_all(fuzzers_dir).await?;

    let mut seen = BTreeSet::new();
    let mut written = Vec::new();

    for report_path in json_files(reports_dir).await? {
        let raw = tokio::fs::read(&report_path).await?;
        let report = match BuildReport::from_slice(&raw) {
            Ok(report) => report,
            Err(e) => {
                tracing::debug!(path = %report_path.display(), error = %e, "not a build report");
                continue;
            }
        };

        for url in report.fuzzer_urls() {
            let Some(name) = file_name(url) else { continue };
            if !seen.insert(name.to_owned()) {
                continue;
            }
            let key = url_to_key(url, bucket);
            let local = fuzzers_dir.join(name);
            tracing::info!(build = %report.build_name, %key, "downloading fuzzer artifact");
            store.download_file(bucket, &key, &local).await?;
            written.push(local);
        }
    }

    if written.is_empty() {
        tracing::warn!(
            reports = %reports_dir.display(),
            "Nothing to run: no fuzzer artifacts in build reports"
        );
    } else {
        tracing::info!(count = written.len(), "fuzzer artifacts downloaded");
    }

    Ok(written)
}

/// `*.json` files directly inside `dir`, sorted. A missing directory has none.
async fn json_files(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
