//! External command invocation for the `gcloud`, `firebase`, `lsof` and
//! `npx` CLIs.
//!
//! Every module that talks to an external CLI goes through the
//! [`CommandRunner`] trait. The real implementation is [`SystemRunner`];
//! tests substitute a scripted double so no binary is ever spawned.
//!
//! # Modes
//! - `capture`: stdout is piped and returned, stderr is captured for errors.
//! - `run`: stdio is inherited so mutating calls stream their own output.
//! - `probe`: all stdio discarded, only the exit status matters.

use std::fmt;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::error::{FbopsError, Result};

/// A fully specified external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliCommand {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
}

impl CliCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
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

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// True if the program or any argument contains `needle`.
    #[cfg(test)]
    pub fn mentions(&self, needle: &str) -> bool {
        self.program.contains(needle) || self.args.iter().any(|a| a.contains(needle))
    }

    fn to_std(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl fmt::Display for CliCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

/// Quote an argument for display only. Commands are never passed to a shell.
fn shell_quote(arg: &str) -> String {
    if arg.is_empty() {
        return "\"\"".to_string();
    }
    if arg.chars().any(|c| c.is_whitespace() || c == '"' || c == '\'') {
        format!("\"{}\"", arg.replace('"', "\\\""))
    } else {
        arg.to_string()
    }
}

/// Narrow interface over "run an external command".
pub trait CommandRunner {
    /// Run `cmd` and return its stdout. A non-zero exit is an error.
    fn capture(&self, cmd: &CliCommand) -> Result<String>;

    /// Run `cmd` with inherited stdio. A non-zero exit is an error.
    fn run(&self, cmd: &CliCommand) -> Result<()>;

    /// Run `cmd` with all output discarded and report whether it succeeded.
    /// Spawn failures count as unsuccessful.
    fn probe(&self, cmd: &CliCommand) -> bool;
}

/// Runs commands on the host with `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn capture(&self, cmd: &CliCommand) -> Result<String> {
        tracing::debug!(command = %cmd, "capture");
        let output = cmd
            .to_std()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| FbopsError::Spawn {
                command: cmd.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(FbopsError::CommandFailed {
                command: cmd.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn run(&self, cmd: &CliCommand) -> Result<()> {
        tracing::debug!(command = %cmd, "run");
        let status = cmd
            .to_std()
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| FbopsError::Spawn {
                command: cmd.to_string(),
                source,
            })?;

        if !status.success() {
            return Err(FbopsError::CommandFailed {
                command: cmd.to_string(),
                status: status.to_string(),
                stderr: String::new(),
            });
        }
        Ok(())
    }

    fn probe(&self, cmd: &CliCommand) -> bool {
        tracing::debug!(command = %cmd, "probe");
        cmd.to_std()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}
