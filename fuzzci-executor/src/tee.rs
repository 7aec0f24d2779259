//! Tee executor: runs a shell command and duplicates its output.
//!
//! The combined stdout/stderr stream of the child is copied chunk by chunk
//! into the run log and into a forward sink (the orchestrator's own stdout
//! by default), so CI keeps a persisted artifact of the raw output while it
//! stays visible in the console. No timeout is enforced here; hang policy
//! belongs to the container (`--hung-check`).

use std::path::Path;
use std::process::Stdio;
use std::time::Instant;

use fuzzci_core::RunResult;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;

use crate::ExecutorError;

const COPY_CHUNK: usize = 8 * 1024;

/// Run `command` through `sh`, teeing its combined output to `log_path` and
/// the process's stdout. Blocks until the child exits.
///
/// # Errors
/// Returns [`ExecutorError::SpawnFailed`] if the shell cannot be started and
/// [`ExecutorError::Io`] if the log cannot be written.
pub async fn execute(command: &str, log_path: &Path) -> Result<RunResult, ExecutorError> {
    execute_with_sink(command, log_path, tokio::io::stdout()).await
}

/// Like [`execute`], forwarding output to `sink` instead of stdout.
///
/// # Errors
/// See [`execute`]; a failing sink is reported as [`ExecutorError::Io`].
pub async fn execute_with_sink<W>(
    command: &str,
    log_path: &Path,
    mut sink: W,
) -> Result<RunResult, ExecutorError>
where
    W: AsyncWrite + Unpin,
{
    if let Some(parent) = log_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut log = tokio::fs::File::create(log_path).await?;

    let started = Instant::now();

    // `exec 2>&1` folds stderr into the single stdout pipe for every
    // statement of the command, not just the last one.
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(format!("exec 2>&1\n{command}"))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ExecutorError::SpawnFailed(format!("exec sh: {e}")))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ExecutorError::SpawnFailed("stdout not piped".to_owned()))?;

    let copied = tee_stream(stdout, &mut log, &mut sink).await?;
    let status = child.wait().await?;
    let elapsed = started.elapsed();

    tracing::info!(
        exit_code = ?status.code(),
        bytes = copied,
        elapsed_ms = elapsed.as_millis(),
        log = %log_path.display(),
        "run process exited"
    );

    Ok(RunResult::new(status.code(), log_path.to_owned(), elapsed))
}

/// Copy `source` into both writers until EOF. Returns the byte count.
async fn tee_stream<R, A, B>(mut source: R, first: &mut A, second: &mut B) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
    A: AsyncWrite + Unpin,
    B: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; COPY_CHUNK];
    let mut total = 0u64;
    loop {
        let n = source.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        first.write_all(&buf[..n]).await?;
        second.write_all(&buf[..n]).await?;
        total += n as u64;
    }
    first.flush().await?;
    second.flush().await?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tee_stream_duplicates_every_byte() {
        let payload: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        let mut a = Vec::new();
        let mut b = Vec::new();
        let n = match tee_stream(payload.as_slice(), &mut a, &mut b).await {
            Ok(n) => n,
            Err(e) => panic!("tee failed: {e}"),
        };
        assert_eq!(n, payload.len() as u64);
        assert_eq!(a, payload, "first writer must receive the full stream");
        assert_eq!(b, payload, "second writer must receive the full stream");
    }

    #[tokio::test]
    async fn tee_stream_empty_source() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        let n = match tee_stream(&b""[..], &mut a, &mut b).await {
            Ok(n) => n,
            Err(e) => panic!("tee failed: {e}"),
        };
        assert_eq!(n, 0);
        assert!(a.is_empty() && b.is_empty());
    }
}
