//! `xeno ssh` — an ssh wrapper that watches for edits started remotely.
//!
//! The remote shell's stdout is tee'd into a named pipe: `tee` keeps the
//! user's terminal byte-identical while this process reads the duplicate
//! stream line by line. When a line decodes as a discovery token (the
//! remote user ran `xeno edit` in the session), the shell is frozen with
//! `SIGSTOP`, a sync daemon is started against the announced repository,
//! the editor opens on the local clone, and the shell resumes with
//! `SIGCONT`.
//!
//! Invocations that carry an explicit remote command are not interactive;
//! they pass straight through to ssh.

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use nix::sys::signal::{kill, Signal};
use nix::unistd::{mkfifo, Pid};
use tracing::debug;
use uuid::Uuid;

use crate::config::Config;
use crate::daemon;
use crate::editor;
use crate::error::{Error, Result};
use crate::git;
use crate::runner::{CommandRunner, ProcessRunner};
use crate::token::{self, DiscoveryToken};
use crate::workdir;

/// ssh single-letter options that consume a value, per ssh(1). Anything
/// else starting with `-` is passed through untouched.
const VALUE_FLAGS: &str = "BbcDeEFiIJlLmoOpQRSwW";

/// What we managed to learn from an ssh argument vector.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SshInvocation {
    pub user: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Everything after the destination: an explicit remote command.
    pub remote_command: Vec<String>,
}

impl SshInvocation {
    pub fn is_interactive(&self) -> bool {
        self.remote_command.is_empty()
    }
}

/// Parses just enough of an ssh argument vector to recover the user, host,
/// and port needed for clone URLs later. Unrecognized flags are skipped
/// (and still reach ssh unchanged, since the original vector is what gets
/// executed).
pub fn parse_ssh_args(args: &[String]) -> SshInvocation {
    let mut invocation = SshInvocation::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        if let Some(rest) = arg.strip_prefix('-') {
            let mut chars = rest.chars();
            let Some(flag) = chars.next() else {
                continue;
            };
            let inline: String = chars.collect();
            if VALUE_FLAGS.contains(flag) {
                let value = if inline.is_empty() {
                    iter.next().cloned().unwrap_or_default()
                } else {
                    inline
                };
                match flag {
                    'p' => invocation.port = value.parse().ok(),
                    'l' => invocation.user = Some(value),
                    _ => {}
                }
            }
            continue;
        }

        // First bare word is the destination; the rest is a remote command.
        match arg.split_once('@') {
            Some((user, host)) => {
                invocation.user = Some(user.to_string());
                invocation.host = Some(host.to_string());
            }
            None => invocation.host = Some(arg.clone()),
        }
        invocation.remote_command = iter.cloned().collect();
        break;
    }

    invocation
}

/// Removes the named pipe when the interception ends, even on error paths.
struct FifoGuard {
    path: PathBuf,
}

impl FifoGuard {
    fn create(workdir: &Path) -> Result<Self> {
        let path = workdir.join(format!("fifo-{}", Uuid::new_v4().simple()));
        mkfifo(&path, nix::sys::stat::Mode::S_IRUSR | nix::sys::stat::Mode::S_IWUSR)
            .map_err(std::io::Error::from)?;
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FifoGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            debug!("unable to remove {}: {e}", self.path.display());
        }
    }
}

/// Runs the ssh command, intercepting interactive sessions. Returns the
/// process exit code (ssh's own).
pub fn run(config: &Config, args: &[String]) -> Result<i32> {
    let invocation = parse_ssh_args(args);

    if !invocation.is_interactive() {
        // Explicit remote command: nothing to intercept.
        let status = ProcessRunner.run_interactive("ssh", args)?;
        return Ok(status.code().unwrap_or(1));
    }

    let runner = ProcessRunner;
    let workdir = workdir::working_directory(config)?;
    let fifo = FifoGuard::create(&workdir)?;

    let mut ssh = Command::new("ssh")
        .args(args)
        .stdout(Stdio::piped())
        .spawn()
        .map_err(|e| Error::CommandFailed {
            command: "ssh".to_string(),
            message: e.to_string(),
        })?;
    let ssh_stdout = ssh.stdout.take().expect("stdout was piped");
    let ssh_pid = Pid::from_raw(ssh.id() as i32);

    // tee duplicates the stream: the user's terminal gets it via tee's
    // inherited stdout, we get it via the pipe.
    let mut tee = Command::new("tee")
        .arg(fifo.path())
        .stdin(Stdio::from(ssh_stdout))
        .spawn()
        .map_err(|e| Error::CommandFailed {
            command: "tee".to_string(),
            message: e.to_string(),
        })?;

    // Open for reading only after both children exist: the open blocks
    // until tee opens the write side.
    let reader = std::io::BufReader::new(std::fs::File::open(fifo.path())?);

    let mut intercepting = true;
    for line in reader.lines() {
        let Ok(line) = line else {
            break;
        };
        if !intercepting {
            continue;
        }
        let Some(found) = token::decode(&line) else {
            continue;
        };

        // Freeze the shell during the handover so the daemon handshake and
        // editor startup don't fight the session for the terminal.
        let _ = kill(ssh_pid, Signal::SIGSTOP);
        if let Err(e) = handle_token(&runner, config, &invocation, &found) {
            eprintln!("Error: {e}");
            // Keep draining the pipe so tee (and the terminal) stay alive,
            // but stop reacting to tokens.
            intercepting = false;
        }
        let _ = kill(ssh_pid, Signal::SIGCONT);
    }

    let status = ssh.wait()?;
    let _ = tee.wait();
    Ok(status.code().unwrap_or(1))
}

/// Reacts to one discovery token: start the daemon, open the editor.
///
/// A missing editor is deliberately non-fatal; the shell session has to be
/// recoverable.
fn handle_token(
    runner: &dyn CommandRunner,
    config: &Config,
    invocation: &SshInvocation,
    found: &DiscoveryToken,
) -> Result<()> {
    let host = invocation
        .host
        .as_deref()
        .ok_or_else(|| Error::TokenHandshake {
            reason: "cannot determine the remote host from the ssh arguments".to_string(),
        })?;
    let url = git::clone_url(
        invocation.user.as_deref(),
        host,
        invocation.port,
        &found.repo_path,
    );

    let editable = daemon::spawn_sync_daemon(found.is_file, &found.remote_path, &url)?;

    match editor::run(runner, config, &editable) {
        Ok(_) => {}
        Err(e) => eprintln!("Warning: unable to launch the editor: {e}"),
    }
    Ok(())
}
