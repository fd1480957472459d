//! Process execution primitives shared by actions and lookups.

use std::path::Path;
use std::process::{Command, Output};

use serde::Serialize;

use crate::error::{Error, Result};

/// Captured output of a finished step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapturedOutput {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stdout: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stderr: String,
}

impl CapturedOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn from_output(output: &Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }

    /// Diagnostic-only output (e.g. a spawn error message).
    pub fn stderr_only(message: impl Into<String>) -> Self {
        Self::new(String::new(), message)
    }

    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty() && self.stderr.is_empty()
    }

    /// Trimmed stderr, falling back to stdout when stderr is empty.
    pub fn diagnostic(&self) -> &str {
        if !self.stderr.trim().is_empty() {
            self.stderr.trim()
        } else {
            self.stdout.trim()
        }
    }
}

/// Run a program to completion and return trimmed stdout on success.
///
/// Used for lookups that happen while a workflow is assembled, where a
/// failure is an error rather than a step result.
pub fn run_in(dir: Option<&Path>, program: &str, args: &[String], context: &str) -> Result<String> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }

    let output = cmd.output().map_err(|e| {
        Error::internal_io(
            format!("Failed to run {}: {}", context, e),
            Some(context.to_string()),
        )
    })?;

    if !output.status.success() {
        return Err(Error::internal_io(
            format!(
                "{} failed: {}",
                context,
                CapturedOutput::from_output(&output).diagnostic()
            ),
            Some(context.to_string()),
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_prefers_stderr() {
        let output = CapturedOutput::new("stdout content", "stderr content\n");
        assert_eq!(output.diagnostic(), "stderr content");
    }

    #[test]
    fn diagnostic_falls_back_to_stdout() {
        let output = CapturedOutput::new("stdout content\n", "  ");
        assert_eq!(output.diagnostic(), "stdout content");
    }

    #[cfg(unix)]
    #[test]
    fn run_in_returns_trimmed_stdout() {
        let out = run_in(None, "echo", &["hello".to_string()], "echo test").unwrap();
        assert_eq!(out, "hello");
    }

    #[test]
    fn run_in_fails_for_missing_program() {
        let result = run_in(None, "nonexistent_command_xyz", &[], "lookup");
        assert_eq!(result.unwrap_err().code.as_str(), "internal.io_error");
    }

    #[cfg(unix)]
    #[test]
    fn run_in_fails_on_non_zero_exit() {
        assert!(run_in(None, "false", &[], "false").is_err());
    }
}
