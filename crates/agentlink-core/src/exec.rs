//! Running external commands with a deadline

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Captured result of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Errors from running an external command
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Failed to start '{program}': {message}")]
    Spawn { program: String, message: String },

    #[error("'{command}' timed out after {}s", timeout.as_secs())]
    Timeout { command: String, timeout: Duration },

    #[error("'{command}' exited with {}: {stderr}", code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}")))]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("I/O error while running '{command}': {message}")]
    Io { command: String, message: String },
}

/// Run `program` with `args`, killing it if it outlives `timeout`
///
/// A non-zero exit is an error carrying the command's stderr. Nothing is
/// retried.
pub fn run_with_timeout(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<CommandOutput, ExecError> {
    let command = std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ");
    let io_err = |e: std::io::Error| ExecError::Io {
        command: command.clone(),
        message: e.to_string(),
    };

    debug!(command = %command, "running");
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ExecError::Spawn {
            program: program.to_string(),
            message: e.to_string(),
        })?;

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let start = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait().map_err(io_err)? {
            break status;
        }
        if start.elapsed() >= timeout {
            warn!(command = %command, "timed out, killing");
            let _ = child.kill();
            let _ = child.wait();
            return Err(ExecError::Timeout {
                command: command.clone(),
                timeout,
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    let collect = |handle: Option<thread::JoinHandle<String>>| {
        handle
            .and_then(|h| h.join().ok())
            .unwrap_or_default()
    };
    let output = CommandOutput {
        stdout: collect(stdout),
        stderr: collect(stderr),
    };

    if status.success() {
        Ok(output)
    } else {
        Err(ExecError::Failed {
            command,
            code: status.code(),
            stderr: output.stderr.trim().to_string(),
        })
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = String::new();
        let _ = reader.read_to_string(&mut buf);
        buf
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_success_captures_stdout() {
        let out = run_with_timeout("sh", &["-c", "echo hello"], Duration::from_secs(5)).unwrap();
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[test]
    fn test_non_zero_exit_is_failure() {
        let err = run_with_timeout("sh", &["-c", "echo nope >&2; exit 3"], Duration::from_secs(5))
            .unwrap_err();
        match err {
            ExecError::Failed { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "nope");
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn test_timeout_kills() {
        let start = Instant::now();
        let err = run_with_timeout("sleep", &["5"], Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, ExecError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_missing_program() {
        let err = run_with_timeout("agentlink-no-such-binary", &[], Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
    }
}
