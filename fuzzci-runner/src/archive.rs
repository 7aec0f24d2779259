//! Zip helpers for seed corpora and the published corpus archive.
//!
//! Both functions are blocking; async callers run them on
//! `tokio::task::spawn_blocking`.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::PipelineError;

/// Archive every regular file under `source` into a new zip at
/// `archive_path`.
///
/// Member names are the file paths relative to `base`, with `/` separators,
/// so the archive is relocatable. A missing `source` yields an empty archive.
/// Returns the number of members written.
///
/// # Errors
/// Returns [`PipelineError::Io`] or [`PipelineError::Archive`] on failure.
pub fn zip_tree(source: &Path, base: &Path, archive_path: &Path) -> Result<usize, PipelineError> {
    let file = File::create(archive_path)?;
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut members = 0usize;
    if source.is_dir() {
        for entry in walkdir::WalkDir::new(source).sort_by_file_name() {
            let entry = entry.map_err(|e| PipelineError::Io(std::io::Error::other(e)))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = member_name(entry.path(), base);
            writer.start_file(name, options)?;
            let mut input = BufReader::new(File::open(entry.path())?);
            std::io::copy(&mut input, &mut writer)?;
            members += 1;
        }
    }

    writer.finish()?;
    Ok(members)
}

/// Extract `archive_path` into `dest`, creating it if needed.
///
/// Returns the number of files extracted.
///
/// # Errors
/// Returns [`PipelineError::UnsafeArchiveEntry`] for entries that would land
/// outside `dest`, and [`PipelineError::Archive`] for corrupt archives.
pub fn extract_zip(archive_path: &Path, dest: &Path) -> Result<usize, PipelineError> {
    let mut archive = ZipArchive::new(BufReader::new(File::open(archive_path)?))?;
    std::fs::create_dir_all(dest)?;

    let mut files = 0usize;
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            return Err(PipelineError::UnsafeArchiveEntry {
                archive: archive_path.to_owned(),
                entry: entry.name().to_owned(),
            });
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut output = BufWriter::new(File::create(&target)?);
        std::io::copy(&mut entry, &mut output)?;
        files += 1;
    }

    Ok(files)
}

/// Zip member name for `path`: relative to `base`, joined with `/`.
fn member_name(path: &Path, base: &Path) -> String {
    let relative: PathBuf = path.strip_prefix(base).unwrap_or(path).to_path_buf();
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::io::{Read, Write};

    use super::*;

    fn write(path: &Path, contents: &[u8]) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(path, contents).expect("write file");
    }

    fn read_members(archive_path: &Path) -> BTreeMap<String, Vec<u8>> {
        let file = File::open(archive_path).expect("open archive");
        let mut archive = ZipArchive::new(file).expect("valid zip");
        let mut members = BTreeMap::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).expect("entry");
            let mut data = Vec::new();
            entry.read_to_end(&mut data).expect("read entry");
            members.insert(entry.name().to_owned(), data);
        }
        members
    }

    #[test]
    fn member_names_are_relative_to_base() {
        let base = Path::new("/tmp/w/result_path");
        let name = member_name(Path::new("/tmp/w/result_path/corpus/foo_fuzzer/u1"), base);
        assert_eq!(name, "corpus/foo_fuzzer/u1");
    }

    #[test]
    fn zip_tree_then_extract_reproduces_tree() {
        let work = tempfile::tempdir().expect("tempdir");
        let result = work.path().join("result_path");
        write(&result.join("corpus/foo_fuzzer/unit-1"), b"one");
        write(&result.join("corpus/foo_fuzzer/unit-2"), b"two");
        write(&result.join("corpus/bar_fuzzer/nested/unit-3"), b"three");
        write(&result.join("run.log"), b"not archived");

        let archive = result.join("corpus.zip");
        let count = zip_tree(&result.join("corpus"), &result, &archive).expect("zip");
        assert_eq!(count, 3);

        let members = read_members(&archive);
        let names: Vec<&str> = members.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec![
                "corpus/bar_fuzzer/nested/unit-3",
                "corpus/foo_fuzzer/unit-1",
                "corpus/foo_fuzzer/unit-2",
            ]
        );
        assert!(names.iter().all(|n| !n.starts_with('/')), "members must be relative");

        let restored = work.path().join("restored");
        let extracted = extract_zip(&archive, &restored).expect("extract");
        assert_eq!(extracted, 3);
        assert_eq!(std::fs::read(restored.join("corpus/foo_fuzzer/unit-1")).expect("read"), b"one");
        assert_eq!(
            std::fs::read(restored.join("corpus/bar_fuzzer/nested/unit-3")).expect("read"),
            b"three"
        );
    }

    #[test]
    fn zip_tree_missing_source_writes_empty_archive() {
        let work = tempfile::tempdir().expect("tempdir");
        let archive = work.path().join("corpus.zip");
        let count = zip_tree(&work.path().join("corpus"), work.path(), &archive).expect("zip");
        assert_eq!(count, 0);
        assert!(read_members(&archive).is_empty());
    }

    #[test]
    fn extract_rejects_path_traversal() {
        let work = tempfile::tempdir().expect("tempdir");
        let archive = work.path().join("evil_seed_corpus.zip");
        {
            let mut writer = ZipWriter::new(File::create(&archive).expect("create"));
            writer
                .start_file("../escape", FileOptions::default())
                .expect("start file");
            writer.write_all(b"x").expect("write");
            writer.finish().expect("finish");
        }

        let result = extract_zip(&archive, &work.path().join("evil.in"));
        assert!(
            matches!(result, Err(PipelineError::UnsafeArchiveEntry { .. })),
            "traversal entries must be rejected, got {result:?}"
        );
        assert!(!work.path().join("escape").exists());
    }

    #[test]
    fn extract_corrupt_archive_is_error() {
        let work = tempfile::tempdir().expect("tempdir");
        let archive = work.path().join("bad_seed_corpus.zip");
        write(&archive, b"definitely not a zip");
        let result = extract_zip(&archive, &work.path().join("bad.in"));
        assert!(matches!(result, Err(PipelineError::Archive(_))));
    }
}
