//! Corpus publisher: archives the final corpus and uploads it.
//!
//! Only ever invoked after a successful run. The whole `corpus/` tree goes
//! into one archive at a fixed key; per-target uploads are not done.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use fuzzci_storage::{ObjectStore, CORPUS_ARCHIVE_KEY};

use crate::archive::zip_tree;
use crate::PipelineError;

/// Name of the directory the runner leaves the final corpus in.
pub const CORPUS_DIR: &str = "corpus";

/// Name of the archive written next to it.
pub const CORPUS_ARCHIVE: &str = "corpus.zip";

/// Outcome of a publish step.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct PublishReport {
    /// Local archive that was uploaded.
    pub archive_path: PathBuf,
    /// Remote key it was uploaded to.
    pub key: String,
    /// Number of corpus files in the archive.
    pub members: usize,
    /// Archive size in bytes.
    pub bytes: u64,
    /// Hex SHA-256 of the archive.
    pub sha256: String,
}

/// Archives and uploads the corpus found in a result directory.
pub struct CorpusPublisher<'a, S: ObjectStore> {
    store: &'a S,
    bucket: &'a str,
}

impl<'a, S: ObjectStore> CorpusPublisher<'a, S> {
    /// Create a publisher writing to `bucket` through `store`.
    #[must_use]
    pub fn new(store: &'a S, bucket: &'a str) -> Self {
        Self { store, bucket }
    }

    /// Archive `<result_path>/corpus/` into `<result_path>/corpus.zip` and
    /// upload it to [`CORPUS_ARCHIVE_KEY`].
    ///
    /// # Errors
    /// Archive and upload failures are returned; the caller treats them as
    /// fatal.
    pub async fn publish(&self, result_path: &Path) -> Result<PublishReport, PipelineError> {
        let corpus_dir = result_path.join(CORPUS_DIR);
        let archive_path = result_path.join(CORPUS_ARCHIVE);

        if !tokio::fs::metadata(&corpus_dir).await.is_ok_and(|m| m.is_dir()) {
            tracing::warn!(
                dir = %corpus_dir.display(),
                "corpus directory missing, publishing an empty archive"
            );
        }

        let base = result_path.to_owned();
        let archive = archive_path.clone();
        let (members, digest) = tokio::task::spawn_blocking(move || {
            let members = zip_tree(&corpus_dir, &base, &archive)?;
            let digest = sha256_file(&archive)?;
            Ok::<_, PipelineError>((members, digest))
        })
        .await??;

        let bytes = tokio::fs::metadata(&archive_path).await?.len();

        self.store
            .upload_file(self.bucket, &archive_path, CORPUS_ARCHIVE_KEY)
            .await?;

        tracing::info!(
            key = CORPUS_ARCHIVE_KEY,
            members,
            bytes,
            sha256 = %digest,
            "corpus uploaded"
        );

        Ok(PublishReport {
            archive_path,
            key: CORPUS_ARCHIVE_KEY.to_owned(),
            members,
            bytes,
            sha256: digest,
        })
    }
}

/// Hex SHA-256 of a file's contents.
fn sha256_file(path: &Path) -> Result<String, PipelineError> {
    let mut hasher = Sha256::new();
    let mut file = std::fs::File::open(path)?;
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex(&hasher.finalize()))
}

fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}
