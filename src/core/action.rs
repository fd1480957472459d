//! Leaf actions: one external command, one command pipe, or one filesystem
//! mutation.
//!
//! Every argument is resolved when the action is built. Running an action
//! never returns an error: spawn failures, non-zero exits and filesystem
//! errors all come back as a failed [`StepResult`] with diagnostics, and the
//! containing collection decides what happens next.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use regex::Regex;
use serde::Serialize;

use crate::engine::{FailureKind, StepResult};
use crate::utils::command::CapturedOutput;
use crate::utils::shell;

/// A program invocation with a structured argument vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn command_line(&self) -> String {
        shell::command_line(&self.program, &self.args)
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    Exec(CommandSpec),
    Pipe {
        producer: CommandSpec,
        consumer: CommandSpec,
    },
    Copy {
        from: PathBuf,
        to: PathBuf,
        overwrite: bool,
    },
    Move {
        from: PathBuf,
        to: PathBuf,
    },
    CreateDir {
        path: PathBuf,
    },
    Chmod {
        path: PathBuf,
        mode: u32,
    },
    AppendLines {
        path: PathBuf,
        lines: Vec<String>,
    },
    AppendUnlessMatches {
        path: PathBuf,
        pattern: String,
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    pub label: String,
    #[serde(flatten)]
    pub kind: ActionKind,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub allow_failure: bool,
}

impl Action {
    pub fn new(label: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            label: label.into(),
            kind,
            allow_failure: false,
        }
    }

    pub fn exec(label: impl Into<String>, command: CommandSpec) -> Self {
        Self::new(label, ActionKind::Exec(command))
    }

    pub fn pipe(label: impl Into<String>, producer: CommandSpec, consumer: CommandSpec) -> Self {
        Self::new(label, ActionKind::Pipe { producer, consumer })
    }

    pub fn copy(label: impl Into<String>, from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self::new(
            label,
            ActionKind::Copy {
                from: from.into(),
                to: to.into(),
                overwrite: true,
            },
        )
    }

    pub fn move_file(
        label: impl Into<String>,
        from: impl Into<PathBuf>,
        to: impl Into<PathBuf>,
    ) -> Self {
        Self::new(
            label,
            ActionKind::Move {
                from: from.into(),
                to: to.into(),
            },
        )
    }

    pub fn create_dir(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::new(label, ActionKind::CreateDir { path: path.into() })
    }

    pub fn chmod(label: impl Into<String>, path: impl Into<PathBuf>, mode: u32) -> Self {
        Self::new(
            label,
            ActionKind::Chmod {
                path: path.into(),
                mode,
            },
        )
    }

    pub fn append_lines<I, S>(label: impl Into<String>, path: impl Into<PathBuf>, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            label,
            ActionKind::AppendLines {
                path: path.into(),
                lines: lines.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn append_unless_matches(
        label: impl Into<String>,
        path: impl Into<PathBuf>,
        pattern: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self::new(
            label,
            ActionKind::AppendUnlessMatches {
                path: path.into(),
                pattern: pattern.into(),
                text: text.into(),
            },
        )
    }

    /// Keep the containing collection going when this action fails.
    pub fn allow_failure(mut self) -> Self {
        self.allow_failure = true;
        self
    }

    /// The exec spec, when this action runs a single program.
    pub fn command(&self) -> Option<&CommandSpec> {
        match &self.kind {
            ActionKind::Exec(spec) => Some(spec),
            _ => None,
        }
    }

    /// Human-readable description used in logs.
    pub fn describe(&self) -> String {
        match &self.kind {
            ActionKind::Exec(spec) => spec.command_line(),
            ActionKind::Pipe { producer, consumer } => {
                format!("{} | {}", producer.command_line(), consumer.command_line())
            }
            ActionKind::Copy { from, to, .. } => {
                format!("copy {} -> {}", from.display(), to.display())
            }
            ActionKind::Move { from, to } => format!("move {} -> {}", from.display(), to.display()),
            ActionKind::CreateDir { path } => format!("mkdir -p {}", path.display()),
            ActionKind::Chmod { path, mode } => format!("chmod {:o} {}", mode, path.display()),
            ActionKind::AppendLines { path, lines } => {
                format!("append {} line(s) to {}", lines.len(), path.display())
            }
            ActionKind::AppendUnlessMatches { path, pattern, .. } => {
                format!("append to {} unless /{}/ matches", path.display(), pattern)
            }
        }
    }

    /// Perform the action, blocking until it completes.
    pub fn run(&self) -> StepResult {
        match &self.kind {
            ActionKind::Exec(spec) => run_exec(&self.label, spec),
            ActionKind::Pipe { producer, consumer } => run_pipe(&self.label, producer, consumer),
            ActionKind::Copy {
                from,
                to,
                overwrite,
            } => fs_step(&self.label, copy_file(from, to, *overwrite)),
            ActionKind::Move { from, to } => fs_step(
                &self.label,
                fs::rename(from, to)
                    .map(|_| format!("Moved {} to {}", from.display(), to.display()))
                    .map_err(|e| format!("Failed to move {}: {}", from.display(), e)),
            ),
            ActionKind::CreateDir { path } => fs_step(
                &self.label,
                fs::create_dir_all(path)
                    .map(|_| format!("Ensured directory {}", path.display()))
                    .map_err(|e| format!("Failed to create {}: {}", path.display(), e)),
            ),
            ActionKind::Chmod { path, mode } => fs_step(&self.label, chmod(path, *mode)),
            ActionKind::AppendLines { path, lines } => {
                let mut text = String::new();
                for line in lines {
                    text.push_str(line);
                    text.push('\n');
                }
                fs_step(&self.label, append(path, &text))
            }
            ActionKind::AppendUnlessMatches {
                path,
                pattern,
                text,
            } => fs_step(&self.label, append_unless_matches(path, pattern, text)),
        }
    }
}

fn run_exec(label: &str, spec: &CommandSpec) -> StepResult {
    match spec.to_command().output() {
        Ok(out) => {
            let output = CapturedOutput::from_output(&out);
            if out.status.success() {
                StepResult::success(label, output)
            } else {
                StepResult::failure(label, FailureKind::NonZeroExit, out.status.code(), output)
            }
        }
        Err(e) => StepResult::failure(
            label,
            FailureKind::Spawn,
            None,
            CapturedOutput::stderr_only(format!("Failed to run {}: {}", spec.program, e)),
        ),
    }
}

fn run_pipe(label: &str, producer: &CommandSpec, consumer: &CommandSpec) -> StepResult {
    let mut source = match producer.to_command().stdout(Stdio::piped()).spawn() {
        Ok(child) => child,
        Err(e) => {
            return StepResult::failure(
                label,
                FailureKind::Spawn,
                None,
                CapturedOutput::stderr_only(format!("Failed to run {}: {}", producer.program, e)),
            )
        }
    };

    let Some(pipe) = source.stdout.take() else {
        let _ = source.wait();
        return StepResult::failure(
            label,
            FailureKind::Spawn,
            None,
            CapturedOutput::stderr_only(format!("No stdout from {}", producer.program)),
        );
    };

    let sink = consumer.to_command().stdin(Stdio::from(pipe)).output();
    let source_status = source.wait();

    let out = match sink {
        Ok(out) => out,
        Err(e) => {
            return StepResult::failure(
                label,
                FailureKind::Spawn,
                None,
                CapturedOutput::stderr_only(format!("Failed to run {}: {}", consumer.program, e)),
            )
        }
    };

    let output = CapturedOutput::from_output(&out);
    match source_status {
        Ok(status) if !status.success() => {
            StepResult::failure(label, FailureKind::NonZeroExit, status.code(), output)
        }
        Err(e) => StepResult::failure(
            label,
            FailureKind::Spawn,
            None,
            CapturedOutput::stderr_only(format!("Failed to wait for {}: {}", producer.program, e)),
        ),
        Ok(_) if out.status.success() => StepResult::success(label, output),
        Ok(_) => StepResult::failure(label, FailureKind::NonZeroExit, out.status.code(), output),
    }
}

fn fs_step(label: &str, outcome: std::result::Result<String, String>) -> StepResult {
    match outcome {
        Ok(message) => StepResult::success(label, CapturedOutput::new(message, String::new())),
        Err(message) => StepResult::failure(
            label,
            FailureKind::Filesystem,
            None,
            CapturedOutput::stderr_only(message),
        ),
    }
}

fn copy_file(from: &Path, to: &Path, overwrite: bool) -> std::result::Result<String, String> {
    if !overwrite && to.exists() {
        return Ok(format!("Kept existing {}", to.display()));
    }
    fs::copy(from, to)
        .map(|_| format!("Copied {} to {}", from.display(), to.display()))
        .map_err(|e| format!("Failed to copy {}: {}", from.display(), e))
}

#[cfg(unix)]
fn chmod(path: &Path, mode: u32) -> std::result::Result<String, String> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map(|_| format!("Changed mode of {} to {:o}", path.display(), mode))
        .map_err(|e| format!("Failed to chmod {}: {}", path.display(), e))
}

#[cfg(not(unix))]
fn chmod(path: &Path, _mode: u32) -> std::result::Result<String, String> {
    Err(format!(
        "chmod is not supported on this platform ({})",
        path.display()
    ))
}

fn append(path: &Path, text: &str) -> std::result::Result<String, String> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| format!("Failed to open {}: {}", path.display(), e))?;
    file.write_all(text.as_bytes())
        .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
    Ok(format!("Appended to {}", path.display()))
}

fn append_unless_matches(
    path: &Path,
    pattern: &str,
    text: &str,
) -> std::result::Result<String, String> {
    let re = Regex::new(pattern).map_err(|e| format!("Invalid pattern /{}/: {}", pattern, e))?;

    let existing = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(format!("Failed to read {}: {}", path.display(), e)),
    };

    if re.is_match(&existing) {
        return Ok(format!(
            "Skipped {}: /{}/ already matches",
            path.display(),
            pattern
        ));
    }

    append(path, text)
}
