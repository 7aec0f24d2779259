//! Integration test: the full run workflow against a filesystem object store
//! and a fake container runtime.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use fuzzci_core::{RunResult, RunState};
use fuzzci_executor::{ContainerRuntime, DockerImage, ExecutorError};
use fuzzci_runner::archive::zip_tree;
use fuzzci_runner::{Pipeline, PipelineError, Settings};
use fuzzci_storage::{LocalObjectStore, ObjectStore, StorageError, CORPUS_ARCHIVE_KEY};

const BUCKET: &str = "builds";

/// Delegates to a [`LocalObjectStore`] and records uploads. Can be told to
/// fail listing one prefix or to refuse uploads.
#[derive(Clone)]
struct RecordingStore {
    inner: LocalObjectStore,
    uploads: Arc<Mutex<Vec<String>>>,
    listed: Arc<Mutex<Vec<String>>>,
    broken_prefix: Option<String>,
    fail_uploads: bool,
}

#[async_trait]
impl ObjectStore for RecordingStore {
    async fn download_files(
        &self,
        bucket: &str,
        prefix: &str,
        suffix: &str,
        local_dir: &Path,
    ) -> Result<Vec<PathBuf>, StorageError> {
        self.listed.lock().expect("lock").push(prefix.to_owned());
        if self.broken_prefix.as_deref() == Some(prefix) {
            return Err(StorageError::Io(std::io::Error::other("connection reset")));
        }
        self.inner.download_files(bucket, prefix, suffix, local_dir).await
    }

    async fn download_file(
        &self,
        bucket: &str,
        key: &str,
        local_path: &Path,
    ) -> Result<(), StorageError> {
        self.inner.download_file(bucket, key, local_path).await
    }

    async fn upload_file(
        &self,
        bucket: &str,
        local_path: &Path,
        key: &str,
    ) -> Result<(), StorageError> {
        self.uploads.lock().expect("lock").push(key.to_owned());
        if self.fail_uploads {
            return Err(StorageError::Io(std::io::Error::other("upload refused")));
        }
        self.inner.upload_file(bucket, local_path, key).await
    }
}

/// Pretends to run the container: writes a log and optionally a final
/// corpus, then exits with a fixed code.
#[derive(Clone)]
struct FakeRuntime {
    exit_code: Option<i32>,
    corpus_dir: PathBuf,
    pulls: Arc<Mutex<Vec<String>>>,
    commands: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn pull(&self, image: &DockerImage) -> Result<(), ExecutorError> {
        self.pulls.lock().expect("lock").push(image.to_string());
        Ok(())
    }

    async fn run(&self, command: &str, log_path: &Path) -> Result<RunResult, ExecutorError> {
        self.commands.lock().expect("lock").push(command.to_owned());
        std::fs::write(log_path, b"fuzzing\n")?;
        std::fs::create_dir_all(self.corpus_dir.join("foo_fuzzer"))?;
        std::fs::write(self.corpus_dir.join("foo_fuzzer/unit-new"), b"new")?;
        Ok(RunResult::new(
            self.exit_code,
            log_path.to_owned(),
            Duration::from_millis(5),
        ))
    }

    fn binary(&self) -> &Path {
        Path::new("docker")
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    root: PathBuf,
    store: RecordingStore,
    runtime: FakeRuntime,
    settings: Settings,
}

impl Fixture {
    fn new(exit_code: Option<i32>) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().to_owned();
        let objects = root.join("store").join(BUCKET);

        // Build artifacts referenced by the report.
        let build = objects.join("PRs/1/abc/fuzzers");
        std::fs::create_dir_all(&build).expect("mkdir");
        std::fs::write(build.join("foo_fuzzer"), b"\x7fELF").expect("write");
        std::fs::write(build.join("foo_fuzzer.dict"), b"kw=\"SELECT\"").expect("write");
        std::fs::write(build.join("baz_fuzzer"), b"\x7fELF").expect("write");

        let seeds = root.join("seeds");
        std::fs::create_dir_all(&seeds).expect("mkdir");
        std::fs::write(seeds.join("s1"), b"seed one").expect("write");
        std::fs::write(seeds.join("s2"), b"seed two").expect("write");
        zip_tree(&seeds, &seeds, &build.join("bar_seed_corpus.zip")).expect("zip seeds");

        // Historical corpus exists for foo only.
        let corpus = objects.join("fuzzer/corpus/foo_fuzzer");
        std::fs::create_dir_all(&corpus).expect("mkdir");
        std::fs::write(corpus.join("unit-a"), b"a").expect("write");
        std::fs::write(corpus.join("unit-b"), b"b").expect("write");

        let reports = root.join("reports");
        std::fs::create_dir_all(&reports).expect("mkdir");
        let base = "https://s3.amazonaws.com/builds/PRs/1/abc/fuzzers";
        let report = format!(
            r#"{{"build_name": "fuzzers", "build_urls": [
                "{base}/foo_fuzzer", "{base}/foo_fuzzer.dict",
                "{base}/baz_fuzzer", "{base}/bar_seed_corpus.zip",
                "{base}/clickhouse"
            ]}}"#
        );
        std::fs::write(reports.join("build_report_fuzzers.json"), report).expect("write");
        std::fs::write(
            reports.join("changed_images.json"),
            br#"{"clickhouse/libfuzzer": "4321"}"#,
        )
        .expect("write");

        let vars: HashMap<&str, PathBuf> = HashMap::from([
            ("TEMP_PATH", root.join("tmp")),
            ("REPORT_PATH", reports),
            ("REPO_COPY", root.join("repo")),
            ("FUZZCI_STORAGE_ROOT", root.join("store")),
        ]);
        let settings = Settings::from_lookup(|key| match key {
            "S3_BUILDS_BUCKET" => Some(BUCKET.to_owned()),
            _ => vars.get(key).map(|p| p.display().to_string()),
        })
        .expect("valid settings");

        let store = RecordingStore {
            inner: LocalObjectStore::new(root.join("store")),
            uploads: Arc::default(),
            listed: Arc::default(),
            broken_prefix: None,
            fail_uploads: false,
        };
        let runtime = FakeRuntime {
            exit_code,
            corpus_dir: settings.result_path().join("corpus"),
            pulls: Arc::default(),
            commands: Arc::default(),
        };

        Self {
            _dir: dir,
            root,
            store,
            runtime,
            settings,
        }
    }

    fn pipeline(&self) -> Pipeline<RecordingStore, FakeRuntime> {
        Pipeline::new(
            self.store.clone(),
            self.runtime.clone(),
            self.settings.clone(),
            "clickhouse/libfuzzer",
        )
    }

    fn uploads(&self) -> Vec<String> {
        self.store.uploads.lock().expect("lock").clone()
    }
}

#[tokio::test]
async fn successful_run_publishes_corpus_once() {
    let fx = Fixture::new(Some(0));

    let outcome = match fx.pipeline().run("libFuzzer tests").await {
        Ok(o) => o,
        Err(e) => panic!("pipeline failed: {e}"),
    };

    assert!(outcome.result.is_success());
    assert_eq!(fx.uploads(), vec![CORPUS_ARCHIVE_KEY.to_owned()]);
    assert_eq!(
        outcome.states,
        vec![
            RunState::Init,
            RunState::Configuring,
            RunState::FetchingCorpus,
            RunState::Running,
            RunState::Publishing,
            RunState::Done,
        ]
    );

    let published = outcome.published.expect("published report");
    assert_eq!(published.members, 1);
    let uploaded = fx.root.join("store").join(BUCKET).join(CORPUS_ARCHIVE_KEY);
    assert!(uploaded.is_file(), "archive must be at the fixed key");

    // Member names are relative to the result directory.
    let file = std::fs::File::open(&uploaded).expect("open archive");
    let mut archive = zip::ZipArchive::new(file).expect("valid zip");
    assert_eq!(archive.len(), 1);
    assert_eq!(archive.by_index(0).expect("entry").name(), "corpus/foo_fuzzer/unit-new");
}

#[tokio::test]
async fn failed_run_never_publishes() {
    for exit_code in [Some(1), Some(-1), None] {
        let fx = Fixture::new(exit_code);
        let outcome = fx.pipeline().run("libFuzzer tests").await.expect("run completes");

        assert!(!outcome.result.is_success());
        assert!(outcome.published.is_none());
        assert!(fx.uploads().is_empty(), "exit {exit_code:?} must not upload");
        assert!(outcome.states.contains(&RunState::Skipped));
        assert!(!outcome.states.contains(&RunState::Publishing));
        assert_eq!(outcome.states.last(), Some(&RunState::Done));
    }
}

#[tokio::test]
async fn corpus_sync_prepares_targets_and_seeds() {
    let fx = Fixture::new(Some(0));
    let outcome = fx.pipeline().run("libFuzzer tests").await.expect("run completes");

    let fuzzers = fx.settings.fuzzers_path();
    assert_eq!(outcome.sync.targets, vec!["baz_fuzzer", "foo_fuzzer"]);
    assert_eq!(outcome.sync.units, 2);
    assert_eq!(outcome.sync.without_corpus, vec!["baz_fuzzer"]);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(fuzzers.join("foo_fuzzer"))
            .expect("binary downloaded")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o777);
    }

    assert_eq!(
        std::fs::read(fuzzers.join("foo_fuzzer.corpus/unit-a")).expect("corpus unit"),
        b"a"
    );
    assert!(!fuzzers.join("baz_fuzzer.corpus").exists());
    assert_eq!(
        std::fs::read(fuzzers.join("bar.in/s1")).expect("seed extracted"),
        b"seed one"
    );
    assert!(fuzzers.join("foo_fuzzer.dict").is_file());
    assert!(!fuzzers.join("clickhouse").exists(), "non-fuzzer artifacts are not fetched");

    let listed = fx.store.listed.lock().expect("lock").clone();
    assert!(listed.contains(&"fuzzer/corpus/foo_fuzzer/".to_owned()));
    assert!(listed.contains(&"fuzzer/corpus/baz_fuzzer/".to_owned()));
}

#[tokio::test]
async fn storage_failure_aborts_before_container_runs() {
    let mut fx = Fixture::new(Some(0));
    fx.store.broken_prefix = Some("fuzzer/corpus/foo_fuzzer/".to_owned());

    let result = fx.pipeline().run("libFuzzer tests").await;

    assert!(matches!(result, Err(PipelineError::Storage(_))));
    assert!(fx.runtime.commands.lock().expect("lock").is_empty());
    assert!(fx.uploads().is_empty());
}

#[tokio::test]
async fn upload_failure_after_successful_run_is_fatal() {
    let mut fx = Fixture::new(Some(0));
    fx.store.fail_uploads = true;

    let result = fx.pipeline().run("libFuzzer tests").await;

    match result {
        Err(PipelineError::Storage(e)) => assert!(!e.is_no_such_key()),
        Err(e) => panic!("expected storage error, got {e}"),
        Ok(outcome) => panic!("upload failure must abort, published {:?}", outcome.published),
    }
    assert_eq!(fx.uploads(), vec![CORPUS_ARCHIVE_KEY.to_owned()], "exactly one attempt");
    assert_eq!(fx.runtime.commands.lock().expect("lock").len(), 1);
    assert!(
        !fx.settings.result_path().join("run_summary.json").exists(),
        "no summary for an aborted run"
    );
}

#[tokio::test]
async fn command_carries_image_and_check_toggles() {
    let fx = Fixture::new(Some(0));
    fx.pipeline()
        .run("libFuzzer tests (DatabaseReplicated, s3 storage)")
        .await
        .expect("run completes");

    assert_eq!(
        *fx.runtime.pulls.lock().expect("lock"),
        vec!["clickhouse/libfuzzer:4321".to_owned()]
    );
    let commands = fx.runtime.commands.lock().expect("lock").clone();
    assert_eq!(commands.len(), 1);
    let command = &commands[0];
    assert!(command.starts_with("docker run "));
    assert!(command.contains("-e USE_DATABASE_REPLICATED=1"));
    assert!(command.contains("-e USE_S3_STORAGE_FOR_MERGE_TREE=1"));
    assert!(command.contains("-e RANDOMIZE_OBJECT_KEY_TYPE=1"));
    assert!(command.contains(" clickhouse/libfuzzer:4321 "));
    assert!(!command.contains("CLICKHOUSE_CI_LOGS_CREDENTIALS"));
}

#[tokio::test]
async fn run_summary_is_written() {
    let fx = Fixture::new(Some(2));
    let outcome = fx.pipeline().run("libFuzzer tests").await.expect("run completes");

    let raw = std::fs::read(fx.settings.result_path().join("run_summary.json"))
        .expect("summary written");
    let summary: serde_json::Value = serde_json::from_slice(&raw).expect("valid json");
    assert_eq!(summary["check_name"], "libFuzzer tests");
    assert_eq!(summary["exit_code"], 2);
    assert_eq!(summary["published"], false);
    assert_eq!(summary["run_id"], outcome.run_id.to_string());
}
