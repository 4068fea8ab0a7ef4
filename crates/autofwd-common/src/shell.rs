//! External command execution for autofwd collaborators.
//!
//! Commands are run directly from an argv vector, never through `/bin/sh`,
//! so container-supplied strings can never be interpreted by a shell.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use autofwd_common::shell;
//!
//! let result = shell::exec("docker", &["ps"], Duration::from_secs(10)).await?;
//! if result.success() {
//!     println!("Output: {}", result.stdout);
//! }
//! ```

use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::error::{FwdError, FwdResult};

/// Default `docker` executable.
pub const DOCKER_CMD: &str = "docker";

/// Default `ssh` executable.
pub const SSH_CMD: &str = "ssh";

/// Renders a program and its arguments as a single line for logs and errors.
pub fn display_command<S: AsRef<str>>(program: &str, args: &[S]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg.as_ref());
    }
    line
}

/// Result of an external command execution.
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// The exit code of the command (0 = success, -1 = killed by signal).
    pub exit_code: i32,
    /// The trimmed stdout output.
    pub stdout: String,
    /// The trimmed stderr output.
    pub stderr: String,
}

impl ExecResult {
    /// Returns true if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns the combined output (stdout + stderr) for error messages.
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Executes a command and collects its output.
///
/// The child is killed if it has not exited within `timeout`.
///
/// # Returns
///
/// * `Ok(ExecResult)` - The command ran to completion (any exit code)
/// * `Err(FwdError::ShellExec)` - The command could not be spawned
/// * `Err(FwdError::Timeout)` - The command did not finish in time
pub async fn exec<S: AsRef<str>>(
    program: &str,
    args: &[S],
    timeout: Duration,
) -> FwdResult<ExecResult> {
    let command = display_command(program, args);
    tracing::debug!(command = %command, "Executing command");

    let child = Command::new(program)
        .args(args.iter().map(|a| a.as_ref()))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(timeout, child).await {
        Ok(output) => output.map_err(|e| FwdError::ShellExec {
            command: command.clone(),
            source: e,
        })?,
        Err(_) => return Err(FwdError::Timeout { command, timeout }),
    };

    let exit_code = output.status.code().unwrap_or(-1);
    let result = ExecResult {
        exit_code,
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    };

    if result.success() {
        tracing::trace!(command = %command, exit_code = exit_code, "Command succeeded");
    } else {
        tracing::warn!(
            command = %command,
            exit_code = exit_code,
            stderr = %result.stderr,
            "Command failed"
        );
    }

    Ok(result)
}

/// Executes a command and returns an error on non-zero exit.
///
/// # Returns
///
/// * `Ok(String)` - The stdout output on success
/// * `Err(FwdError)` - If the command fails to run or returns non-zero
pub async fn exec_or_throw<S: AsRef<str>>(
    program: &str,
    args: &[S],
    timeout: Duration,
) -> FwdResult<String> {
    let result = exec(program, args, timeout).await?;
    if result.success() {
        Ok(result.stdout)
    } else {
        Err(FwdError::ShellCommandFailed {
            command: display_command(program, args),
            exit_code: result.exit_code,
            output: result.combined_output(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_display_command() {
        assert_eq!(
            display_command("docker", &["ps", "--format", "{{json .}}"]),
            "docker ps --format {{json .}}"
        );
        assert_eq!(display_command::<&str>("true", &[]), "true");
    }

    #[test]
    fn test_exec_result_success() {
        let result = ExecResult {
            exit_code: 0,
            stdout: "output".to_string(),
            stderr: "".to_string(),
        };
        assert!(result.success());
        assert_eq!(result.combined_output(), "output");
    }

    #[test]
    fn test_exec_result_failure() {
        let result = ExecResult {
            exit_code: 1,
            stdout: "".to_string(),
            stderr: "error message".to_string(),
        };
        assert!(!result.success());
        assert_eq!(result.combined_output(), "error message");
    }

    #[test]
    fn test_exec_result_combined() {
        let result = ExecResult {
            exit_code: 0,
            stdout: "stdout".to_string(),
            stderr: "stderr".to_string(),
        };
        assert_eq!(result.combined_output(), "stdout\nstderr");
    }

    #[tokio::test]
    async fn test_exec_echo() {
        let result = exec("echo", &["hello"], TIMEOUT).await.unwrap();
        assert!(result.success());
        assert_eq!(result.stdout, "hello");
    }

    #[tokio::test]
    async fn test_exec_args_not_shell_expanded() {
        let result = exec("echo", &["$HOME;", "`id`"], TIMEOUT).await.unwrap();
        assert_eq!(result.stdout, "$HOME; `id`");
    }

    #[tokio::test]
    async fn test_exec_failure() {
        let result = exec("sh", &["-c", "exit 42"], TIMEOUT).await.unwrap();
        assert!(!result.success());
        assert_eq!(result.exit_code, 42);
    }

    #[tokio::test]
    async fn test_exec_missing_program() {
        let result = exec::<&str>("/nonexistent/autofwd-no-such-binary", &[], TIMEOUT).await;
        assert!(matches!(result, Err(FwdError::ShellExec { .. })));
    }

    #[tokio::test]
    async fn test_exec_timeout() {
        let result = exec("sleep", &["5"], Duration::from_millis(50)).await;
        match result {
            Err(FwdError::Timeout { command, .. }) => assert_eq!(command, "sleep 5"),
            other => panic!("Expected Timeout error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_exec_or_throw_success() {
        let output = exec_or_throw("echo", &["success"], TIMEOUT).await.unwrap();
        assert_eq!(output, "success");
    }

    #[tokio::test]
    async fn test_exec_or_throw_failure() {
        let result = exec_or_throw("sh", &["-c", "echo boom >&2; exit 1"], TIMEOUT).await;
        match result {
            Err(FwdError::ShellCommandFailed {
                exit_code, output, ..
            }) => {
                assert_eq!(exit_code, 1);
                assert_eq!(output, "boom");
            }
            _ => panic!("Expected ShellCommandFailed error"),
        }
    }
}
