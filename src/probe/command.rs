//! Child-process runner shared by the probe clients.

use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::trace;

use crate::error::ProbeError;

/// Runs `program args...` and returns its stdout when it exits with status zero.
///
/// The child is killed if `deadline` elapses before it exits.
pub async fn run_with_deadline(
    program: &str,
    args: &[String],
    deadline: Duration,
) -> Result<String, ProbeError> {
    let start = Instant::now();
    trace!("Running {} {:?} (deadline {:?})", program, args, deadline);

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(deadline, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(ProbeError::Unavailable {
                tool: program.to_string(),
                reason: e.to_string(),
            })
        }
        Err(_) => {
            return Err(ProbeError::TimedOut {
                tool: program.to_string(),
                elapsed: start.elapsed(),
            })
        }
    };

    if !output.status.success() {
        return Err(ProbeError::NonZeroExit {
            tool: program.to_string(),
            code: output.status.code(),
        });
    }

    String::from_utf8(output.stdout).map_err(|e| ProbeError::ParseFailure {
        tool: program.to_string(),
        detail: format!("output is not valid UTF-8: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_utf8_output_is_parse_failure() {
        let result = run_with_deadline(
            "sh",
            &["-c".to_string(), "printf 'bad \\377 byte'".to_string()],
            Duration::from_secs(2),
        )
        .await;
        assert!(matches!(result, Err(ProbeError::ParseFailure { .. })));
    }

    #[tokio::test]
    async fn test_missing_program_is_unavailable() {
        let result = run_with_deadline(
            "netpulse-definitely-not-a-real-tool",
            &[],
            Duration::from_secs(1),
        )
        .await;
        assert!(matches!(result, Err(ProbeError::Unavailable { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_deadline_kills_slow_program() {
        let result = run_with_deadline(
            "sleep",
            &["5".to_string()],
            Duration::from_millis(100),
        )
        .await;
        assert!(matches!(result, Err(ProbeError::TimedOut { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit() {
        let result = run_with_deadline("false", &[], Duration::from_secs(2)).await;
        assert!(matches!(result, Err(ProbeError::NonZeroExit { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdout_captured() {
        let out = run_with_deadline("echo", &["hello".to_string()], Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(out.trim(), "hello");
    }
}
