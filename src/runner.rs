//! Trait abstraction for executing external commands (git, ssh, the editor).
//!
//! All orchestration code (the sync loop, the remote builder, the edit and
//! session commands) uses [`CommandRunner`] rather than calling
//! `std::process::Command` directly. This enables unit-testing command
//! sequences with a mock implementation that records invocations and returns
//! canned results, without needing git or ssh installed.

use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use crate::error::{Error, Result};

/// Output captured from a non-interactive command.
#[derive(Debug)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: ExitStatus,
}

/// Abstraction over shelling out to git, ssh, and interactive programs.
///
/// Each method corresponds to a distinct invocation pattern:
/// - `run_git`: `git <args>` with an optional working directory, captures
///   output.
/// - `run_ssh`: non-interactive `ssh [-p port] destination "command"`,
///   captures output.
/// - `run_interactive`: runs a program that inherits the terminal (the
///   editor, or ssh passthrough) and returns only its exit status.
pub trait CommandRunner {
    fn run_git(&self, cwd: Option<&Path>, args: &[String]) -> Result<CommandOutput>;
    fn run_ssh(&self, destination: &str, port: Option<u16>, command: &str)
        -> Result<CommandOutput>;
    fn run_interactive(&self, program: &str, args: &[String]) -> Result<ExitStatus>;
}

/// Production [`CommandRunner`] backed by `std::process::Command`.
pub struct ProcessRunner;

impl ProcessRunner {
    fn capture(mut command: Command, label: &str) -> Result<CommandOutput> {
        let output = command
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::CommandFailed {
                command: label.to_string(),
                message: e.to_string(),
            })?;
        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status,
        })
    }
}

impl CommandRunner for ProcessRunner {
    fn run_git(&self, cwd: Option<&Path>, args: &[String]) -> Result<CommandOutput> {
        let mut command = Command::new("git");
        command.args(args);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }
        Self::capture(command, "git")
    }

    fn run_ssh(
        &self,
        destination: &str,
        port: Option<u16>,
        command: &str,
    ) -> Result<CommandOutput> {
        let mut ssh = Command::new("ssh");
        if let Some(port) = port {
            ssh.arg("-p").arg(port.to_string());
        }
        ssh.arg(destination).arg(command);
        Self::capture(ssh, "ssh")
    }

    fn run_interactive(&self, program: &str, args: &[String]) -> Result<ExitStatus> {
        Command::new(program)
            .args(args)
            .status()
            .map_err(|e| Error::CommandFailed {
                command: program.to_string(),
                message: e.to_string(),
            })
    }
}
