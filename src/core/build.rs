use serde::Serialize;
use std::path::Path;

use crate::error::{BuildFailedDetails, Error, Result};
use crate::utils::command::{execute_shell_in_dir, CapturedOutput};
use crate::utils::parser;

const OUTPUT_TAIL_LINES: usize = 15;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub command: String,
    pub exit_code: i32,
    #[serde(flatten)]
    pub output: CapturedOutput,
}

/// Run the build command through the shell in `project_root`, blocking.
///
/// `None` (or an empty command) skips the step. A non-zero exit is fatal.
pub fn run_build(command: Option<&str>, project_root: &Path) -> Result<Option<BuildReport>> {
    let Some(command) = command.map(str::trim).filter(|c| !c.is_empty()) else {
        log_status!("build", "No build command configured, skipping");
        return Ok(None);
    };

    log_status!("build", "Running {} in {}", command, project_root.display());
    let output = execute_shell_in_dir(command, Some(project_root));

    if !output.success {
        let working_dir = project_root.display().to_string();
        let output_tail = parser::tail_lines(output.error_text(), OUTPUT_TAIL_LINES);
        let message = format_build_error(command, &working_dir, output.exit_code, &output_tail);
        return Err(Error::deploy_build_failed(
            message,
            BuildFailedDetails {
                command: command.to_string(),
                exit_code: output.exit_code,
                working_dir,
                output_tail,
            },
        ));
    }

    Ok(Some(BuildReport {
        command: command.to_string(),
        exit_code: output.exit_code,
        output: CapturedOutput::from(&output),
    }))
}

/// Only universal POSIX exit codes get a hint; the build tool is opaque.
fn format_build_error(command: &str, working_dir: &str, exit_code: i32, output_tail: &str) -> String {
    let hint = match exit_code {
        127 => "\nHint: Command not found. Check that the build command and its dependencies are installed and in PATH.",
        126 => "\nHint: Permission denied. Check file permissions on the build script.",
        _ => "",
    };

    let mut msg = format!(
        "Build failed (exit code {}).\n  Command: {}\n  Working directory: {}",
        exit_code, command, working_dir
    );

    if !output_tail.is_empty() {
        msg.push_str(&format!(
            "\n\n--- Build output (last {} lines) ---\n",
            OUTPUT_TAIL_LINES
        ));
        msg.push_str(output_tail);
        msg.push_str("\n--- End of output ---");
    }

    msg.push_str(hint);
    msg
}
