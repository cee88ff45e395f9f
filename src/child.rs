//! Spawns the child command for one attempt, captures its combined
//! output, and enforces the per-attempt timeout.
//!
//! Out of the core's scope per the orchestration contract — the core
//! only needs the resulting `(stdout, stderr, exit_code, elapsed)` —
//! but the binary has to actually run something, so this is the
//! runner's necessary collaborator.

use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::error::{PatienceError, Result};

/// Reads `reader` to EOF, appending each chunk to `buf` as it arrives.
///
/// Accumulating into a shared buffer (rather than a local `String`
/// consumed only on success) means a caller that cancels the future
/// this is polled under still finds whatever was read before
/// cancellation sitting in `buf`.
async fn read_into<R: AsyncRead + Unpin>(mut reader: R, buf: &Mutex<String>) -> std::io::Result<()> {
    let mut chunk = [0u8; 4096];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.lock()
            .expect("output buffer poisoned")
            .push_str(&String::from_utf8_lossy(&chunk[..n]));
    }
}

/// One completed (or timed-out) attempt at running the child.
#[derive(Debug, Clone)]
pub struct CapturedAttempt {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub elapsed: Duration,
    pub timed_out: bool,
}

/// Spawns `program` with `args`, captures stdout/stderr concurrently,
/// and kills the child if it outlives `timeout` (`Duration::ZERO`
/// disables the cap).
pub struct ChildProcess;

impl ChildProcess {
    pub async fn run(program: &str, args: &[String], timeout: Duration) -> Result<CapturedAttempt> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let start = Instant::now();
        let mut child = command.spawn().map_err(PatienceError::ChildExec)?;

        let stdout_pipe = child.stdout.take().expect("stdout was piped");
        let stderr_pipe = child.stderr.take().expect("stderr was piped");

        // Owned by the caller, not by `capture`, so a timed-out `capture`
        // can be dropped (killing the child and its pipes) without losing
        // whatever had already been read into them.
        let stdout_buf = Arc::new(Mutex::new(String::new()));
        let stderr_buf = Arc::new(Mutex::new(String::new()));

        let capture = {
            let stdout_buf = stdout_buf.clone();
            let stderr_buf = stderr_buf.clone();
            async move {
                let (stdout_result, stderr_result, wait_result) = tokio::join!(
                    read_into(stdout_pipe, &stdout_buf),
                    read_into(stderr_pipe, &stderr_buf),
                    child.wait(),
                );
                stdout_result.ok();
                stderr_result.ok();
                let status = wait_result.map_err(PatienceError::ChildExec)?;
                Ok::<_, PatienceError>(status.code().unwrap_or(-1))
            }
        };

        let (exit_code, timed_out) = if timeout.is_zero() {
            (capture.await?, false)
        } else {
            match tokio::time::timeout(timeout, capture).await {
                Ok(result) => (result?, false),
                Err(_) => (-1, true),
            }
        };

        Ok(CapturedAttempt {
            stdout: stdout_buf.lock().expect("output buffer poisoned").clone(),
            stderr: stderr_buf.lock().expect("output buffer poisoned").clone(),
            exit_code,
            elapsed: start.elapsed(),
            timed_out,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let attempt = ChildProcess::run("sh", &["-c".to_string(), "echo hello".to_string()], Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(attempt.stdout.trim(), "hello");
        assert_eq!(attempt.exit_code, 0);
        assert!(!attempt.timed_out);
    }

    #[tokio::test]
    async fn captures_nonzero_exit_code() {
        let attempt = ChildProcess::run("sh", &["-c".to_string(), "exit 7".to_string()], Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(attempt.exit_code, 7);
    }

    #[tokio::test]
    async fn missing_binary_is_a_child_exec_error() {
        let result = ChildProcess::run("definitely-not-a-real-binary", &[], Duration::ZERO).await;
        assert!(matches!(result, Err(PatienceError::ChildExec(_))));
    }

    #[tokio::test]
    async fn per_attempt_timeout_kills_a_long_running_child() {
        let attempt = ChildProcess::run(
            "sh",
            &["-c".to_string(), "sleep 5".to_string()],
            Duration::from_millis(50),
        )
        .await
        .unwrap();
        assert!(attempt.timed_out);
        assert!(attempt.elapsed < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn partial_output_survives_a_timeout() {
        let attempt = ChildProcess::run(
            "sh",
            &["-c".to_string(), "echo Retry-After: 30; sleep 5".to_string()],
            Duration::from_millis(100),
        )
        .await
        .unwrap();
        assert!(attempt.timed_out);
        assert!(attempt.stdout.contains("Retry-After: 30"));
    }
}
