//! Command execution primitives.
//!
//! Failures to spawn are folded into a `CommandOutput` with exit code -1 so
//! callers that tolerate failure (deploy targets) and callers that do not
//! (the build step) share one shape.

use std::path::Path;
use std::process::Command;

use serde::Serialize;

/// Result of running a local process to completion.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

impl CommandOutput {
    fn from_spawn(result: std::io::Result<std::process::Output>) -> Self {
        match result {
            Ok(out) => CommandOutput {
                stdout: String::from_utf8_lossy(&out.stdout).to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).to_string(),
                success: out.status.success(),
                exit_code: out.status.code().unwrap_or(-1),
            },
            Err(e) => CommandOutput {
                stdout: String::new(),
                stderr: format!("Command error: {}", e),
                success: false,
                exit_code: -1,
            },
        }
    }

    /// Prefers stderr, falls back to stdout if stderr is empty.
    pub fn error_text(&self) -> &str {
        if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        }
    }
}

/// Run a shell command line (`sh -c`) in an optional working directory.
pub fn execute_shell_in_dir(command: &str, current_dir: Option<&Path>) -> CommandOutput {
    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    };

    #[cfg(not(windows))]
    let mut cmd = {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    };

    if let Some(dir) = current_dir {
        cmd.current_dir(dir);
    }

    CommandOutput::from_spawn(cmd.output())
}

/// Run a program directly (no shell) with explicit arguments.
pub fn execute_program_in_dir(
    program: &str,
    args: &[String],
    current_dir: Option<&Path>,
) -> CommandOutput {
    let mut cmd = Command::new(program);
    cmd.args(args);

    if let Some(dir) = current_dir {
        cmd.current_dir(dir);
    }

    CommandOutput::from_spawn(cmd.output())
}

/// Captured output from command execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CapturedOutput {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stdout: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stderr: String,
}

impl CapturedOutput {
    pub fn new(stdout: String, stderr: String) -> Self {
        Self { stdout, stderr }
    }

    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty() && self.stderr.is_empty()
    }
}

impl From<&CommandOutput> for CapturedOutput {
    fn from(output: &CommandOutput) -> Self {
        Self::new(output.stdout.clone(), output.stderr.clone())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn shell_command_captures_stdout() {
        let output = execute_shell_in_dir("echo hello", None);
        assert!(output.success);
        assert_eq!(output.exit_code, 0);
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[test]
    fn shell_command_reports_exit_code() {
        let output = execute_shell_in_dir("exit 3", None);
        assert!(!output.success);
        assert_eq!(output.exit_code, 3);
    }

    #[test]
    fn shell_command_runs_in_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
        let output = execute_shell_in_dir("ls", Some(dir.path()));
        assert!(output.stdout.contains("marker.txt"));
    }

    #[test]
    fn missing_program_is_a_failed_output() {
        let output = execute_program_in_dir("nonexistent_command_xyz", &[], None);
        assert!(!output.success);
        assert_eq!(output.exit_code, -1);
        assert!(output.stderr.starts_with("Command error:"));
    }

    #[test]
    fn program_receives_args_verbatim() {
        let args = vec!["%s|%s".to_string(), "a b".to_string(), "c".to_string()];
        let output = execute_program_in_dir("printf", &args, None);
        assert_eq!(output.stdout, "a b|c");
    }

    #[test]
    fn error_text_prefers_stderr() {
        let output = CommandOutput {
            stdout: "stdout content".to_string(),
            stderr: "stderr content".to_string(),
            success: false,
            exit_code: 1,
        };
        assert_eq!(output.error_text(), "stderr content");
    }

    #[test]
    fn error_text_falls_back_to_stdout() {
        let output = CommandOutput {
            stdout: "stdout content\n".to_string(),
            stderr: "  ".to_string(),
            success: false,
            exit_code: 1,
        };
        assert_eq!(output.error_text(), "stdout content");
    }
}
