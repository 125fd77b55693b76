//! Shell execution of the OS10 command-line interface.
//!
//! Show and configure commands are issued through the `clish` binary, one
//! `-c` argument per command line. Arguments are quoted before interpolation
//! to keep interface names and free-form strings from being interpreted by
//! the shell.

use once_cell::sync::Lazy;
use regex::Regex;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{CfgError, CfgResult};

/// Path to the OS10 CLI shell.
pub const CLISH_CMD: &str = "/opt/dell/os10/bin/clish";

/// Command that enters configuration mode.
pub const CONFIGURE_CMD: &str = "configure terminal";

/// Command that leaves configuration mode.
pub const END_CMD: &str = "end";

/// Regex for characters that need escaping in shell double-quotes.
/// Matches: $, `, ", \, and newline
static SHELL_ESCAPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([$`"\\\n])"#).expect("Invalid regex pattern"));

/// Quotes a string for safe use in shell commands.
///
/// Wraps the string in double quotes and escapes the characters that keep
/// their special meaning inside double quotes (`$`, `` ` ``, `"`, `\` and
/// newline).
pub fn shellquote(s: &str) -> String {
    let escaped = SHELL_ESCAPE_RE.replace_all(s, r"\$1");
    format!("\"{}\"", escaped)
}

/// Result of a shell command execution.
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// The exit code of the command (0 = success).
    pub exit_code: i32,
    /// The combined stdout output.
    pub stdout: String,
    /// The combined stderr output.
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

/// Builds a single CLI invocation for one show query.
pub fn show_invocation(query: &str) -> String {
    format!("{} -c {}", CLISH_CMD, shellquote(query))
}

/// Builds a single CLI invocation for an ordered batch of configuration
/// lines. The batch enters configuration mode, replays the lines in order
/// and returns to exec mode, so nested context preambles apply to the lines
/// that follow them.
pub fn configure_invocation(lines: &[String]) -> String {
    let mut cmd = format!("{} -c {}", CLISH_CMD, shellquote(CONFIGURE_CMD));
    for line in lines {
        cmd.push_str(&format!(" -c {}", shellquote(line)));
    }
    cmd.push_str(&format!(" -c {}", shellquote(END_CMD)));
    cmd
}

/// Executes a shell command asynchronously.
///
/// Runs the command through `/bin/sh -c` to support pipes in show queries
/// (e.g. `| display-json`).
pub async fn exec(cmd: &str) -> CfgResult<ExecResult> {
    tracing::debug!(command = %cmd, "Executing shell command");

    let output = Command::new("/bin/sh")
        .arg("-c")
        .arg(cmd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| CfgError::ShellExec {
            command: cmd.to_string(),
            source: e,
        })?;

    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    let result = ExecResult {
        exit_code,
        stdout,
        stderr,
    };

    if result.success() {
        tracing::trace!(command = %cmd, exit_code = exit_code, "Command succeeded");
    } else {
        tracing::warn!(
            command = %cmd,
            exit_code = exit_code,
            stderr = %result.stderr,
            "Command failed"
        );
    }

    Ok(result)
}
