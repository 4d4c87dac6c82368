//! `xeno edit` — the user-facing entry point for editing sessions.
//!
//! Behavior depends on where the path lives and where the command runs:
//! - local path, ordinary shell: just launch the editor (the tool doubles
//!   as an editor wrapper).
//! - local path, inside an ssh session: build the remote repository and
//!   print a discovery token for the driving side to pick up.
//! - remote path: run `xeno edit` on the remote over ssh, decode the token
//!   it prints, start a sync daemon against the announced repository, and
//!   open the editor on the local clone.

use std::path::Path;
use std::process::ExitStatus;

use shell_quote::{Bash, QuoteRefExt};

use crate::config::Config;
use crate::daemon;
use crate::editor;
use crate::error::{Error, Result};
use crate::git;
use crate::remote;
use crate::runner::CommandRunner;
use crate::spec::PathSpec;
use crate::token::{self, DiscoveryToken};
use crate::workdir;

/// Runs the edit command. `in_ssh` is whether this process is itself inside
/// an ssh session (the caller checks for the connection marker). Returns the
/// process exit code.
pub fn run(
    runner: &dyn CommandRunner,
    config: &Config,
    spec_str: &str,
    ignore: &[String],
    in_ssh: bool,
) -> Result<i32> {
    let spec = PathSpec::parse(spec_str)?;

    if spec.is_local() {
        if in_ssh {
            // We are the remote half of someone else's edit: prepare the
            // repository and announce it.
            let workdir = workdir::working_directory(config)?;
            let built = remote::build(runner, &workdir, &spec.file_path, ignore)?;
            println!(
                "{}",
                token::encode(&spec.file_path, &built.repo_path.display().to_string())
            );
            return Ok(0);
        }
        let status = editor::run(runner, config, Path::new(&spec.file_path))?;
        return Ok(exit_code(status));
    }

    let token = request_remote_token(runner, &spec, ignore)?;
    let host = spec.host.as_deref().expect("remote spec has a host");
    let url = git::clone_url(spec.user.as_deref(), host, spec.port, &token.repo_path);

    eprintln!("Starting synchronization daemon...");
    let editable = daemon::spawn_sync_daemon(token.is_file, &token.remote_path, &url)?;

    let status = editor::run(runner, config, &editable)?;
    Ok(exit_code(status))
}

/// Runs `xeno edit` on the remote host and decodes the token it prints.
pub fn request_remote_token(
    runner: &dyn CommandRunner,
    spec: &PathSpec,
    ignore: &[String],
) -> Result<DiscoveryToken> {
    let destination = spec.ssh_destination().ok_or_else(|| Error::TokenHandshake {
        reason: "not a remote specification".to_string(),
    })?;
    let command = remote_edit_command(&spec.file_path, ignore);

    let output = runner.run_ssh(&destination, spec.port, &command)?;
    if !output.status.success() {
        return Err(Error::TokenHandshake {
            reason: format!("remote edit failed: {}", output.stderr.trim()),
        });
    }

    find_token(&output.stdout).ok_or_else(|| Error::TokenHandshake {
        reason: "no initialization token in the remote output".to_string(),
    })
}

/// Builds the remote `xeno edit` command line. The path and patterns are
/// shell-quoted: they pass through the remote user's shell.
pub fn remote_edit_command(file_path: &str, ignore: &[String]) -> String {
    let mut command = format!("xeno edit {}", quoted(file_path));
    for pattern in ignore {
        command.push_str(" -i ");
        command.push_str(&quoted(pattern));
    }
    command
}

fn quoted(text: &str) -> String {
    text.quoted(Bash)
}

/// Scans command output for a discovery token, line by line; tokens are
/// only recognized at the start of a line.
pub fn find_token(output: &str) -> Option<DiscoveryToken> {
    output.lines().find_map(token::decode)
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}
