//! External process plumbing shared by the local engines

use super::EngineError;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest stderr excerpt carried into an error.
const MAX_STDERR_LEN: usize = 2000;

fn spawn_error(program: &str, err: std::io::Error) -> EngineError {
    if err.kind() == ErrorKind::NotFound {
        EngineError::Unavailable(format!("{} not found", program))
    } else {
        EngineError::Failed(format!("Failed to execute {}: {}", program, err))
    }
}

/// Run `program` with `input` on stdin and return its stdout.
///
/// The child is killed when the timeout fires.
pub async fn run_process(
    program: &str,
    args: &[String],
    input: &[u8],
    timeout: Duration,
) -> Result<Vec<u8>, EngineError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| spawn_error(program, e))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| EngineError::Failed(format!("{} stdin unavailable", program)))?;

    let write = async move {
        let result = stdin.write_all(input).await;
        drop(stdin);
        result
    };

    let (write_result, output) =
        tokio::time::timeout(timeout, async move { tokio::join!(write, child.wait_with_output()) })
            .await
            .map_err(|_| EngineError::Timeout(timeout))?;

    let output = output.map_err(|e| EngineError::Failed(format!("{} failed: {}", program, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr: String = stderr.trim().chars().take(MAX_STDERR_LEN).collect();
        return Err(EngineError::Failed(format!(
            "{} exited with {}: {}",
            program, output.status, stderr
        )));
    }

    // Tools may stop reading stdin early
    if let Err(e) = write_result {
        tracing::debug!(program = %program, error = %e, "Engine closed stdin early");
    }

    Ok(output.stdout)
}

/// First line of `<program> --version`.
pub async fn probe_version(program: &str) -> Result<String, EngineError> {
    let output = run_process(program, &["--version".to_string()], b"", VERSION_PROBE_TIMEOUT).await?;

    String::from_utf8_lossy(&output)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .ok_or_else(|| EngineError::Failed(format!("{} printed no version", program)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_pipes_stdin_to_stdout() {
        let out = run_process("cat", &[], b"hello engine", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out, b"hello engine");
    }

    #[tokio::test]
    async fn test_large_input_does_not_deadlock() {
        let input = vec![b'x'; 4 * 1024 * 1024];
        let out = run_process("cat", &[], &input, Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(out.len(), input.len());
    }

    #[tokio::test]
    async fn test_nonzero_exit_carries_stderr() {
        let err = run_process(
            "sh",
            &args(&["-c", "echo boom >&2; exit 3"]),
            b"",
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();

        match err {
            EngineError::Failed(msg) => assert!(msg.contains("boom")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout() {
        let err = run_process("sleep", &args(&["5"]), b"", Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let err = run_process("mdconv-no-such-tool", &[], b"", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Unavailable(_)));
    }
}
