//! Enumeration and control of live sync sessions.
//!
//! Every sync daemon leaves a local clone at `WORKDIR/local-<uuid>/<name>`
//! with its metadata in the repository config. The registry is rebuilt on
//! demand by scanning that layout: there is no separate session database to
//! fall out of date. Daemons that have died are filtered out by a signal-0
//! liveness probe.

use std::path::{Path, PathBuf};

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tracing::debug;

use crate::error::{Error, Result};
use crate::git;
use crate::runner::CommandRunner;

/// Whether the local clone currently has uncommitted changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Synced,
    Unsynced,
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncState::Synced => write!(f, "synced"),
            SyncState::Unsynced => write!(f, "unsynced"),
        }
    }
}

/// One live pairing of a local repository and its daemon process.
#[derive(Debug, Clone)]
pub struct Session {
    pub process_id: i32,
    pub repo_path: PathBuf,
    pub clone_url: String,
    pub remote_path: String,
    pub remote_is_file: bool,
    pub sync_state: SyncState,
}

impl Session {
    /// The path handed to the editor: the single file inside the clone for
    /// file sessions, the clone root for directory sessions.
    pub fn editable_path(&self) -> PathBuf {
        if self.remote_is_file {
            match Path::new(&self.remote_path).file_name() {
                Some(name) => self.repo_path.join(name),
                None => self.repo_path.clone(),
            }
        } else {
            self.repo_path.clone()
        }
    }

    /// `user@host` (or bare host) extracted from the stored clone URL, for
    /// display.
    pub fn remote_host(&self) -> String {
        let rest = self
            .clone_url
            .strip_prefix("ssh://")
            .unwrap_or(&self.clone_url);
        rest.split('/').next().unwrap_or("").to_string()
    }
}

/// Probes a pid for liveness with signal 0.
pub fn is_alive(pid: i32) -> bool {
    kill(Pid::from_raw(pid), None).is_ok()
}

/// Parses the stored boolean metadata spelling. Both `true`/`false` and the
/// capitalized forms written by older sessions are accepted.
fn parse_bool_metadata(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Scans the working directory for live sessions.
///
/// Repositories with malformed metadata or dead daemons are skipped with a
/// diagnostic; they are reclaimed by manual cleanup, not here.
pub fn get_sessions(runner: &dyn CommandRunner, workdir: &Path) -> Result<Vec<Session>> {
    let mut sessions = Vec::new();

    for container in list_subdirs(workdir)? {
        let name = container.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if !name.starts_with("local-") {
            continue;
        }
        for repo in list_subdirs(&container)? {
            match read_session(runner, &repo) {
                Some(session) => sessions.push(session),
                None => debug!("skipping stale session at {}", repo.display()),
            }
        }
    }

    sessions.sort_by_key(|s| s.process_id);
    Ok(sessions)
}

fn list_subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut subdirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            subdirs.push(path);
        }
    }
    Ok(subdirs)
}

fn read_session(runner: &dyn CommandRunner, repo: &Path) -> Option<Session> {
    let pid_raw = git::get_metadata(runner, repo, "syncProcessId");
    let process_id: i32 = match pid_raw.parse() {
        Ok(pid) => pid,
        Err(_) => {
            debug!("invalid sync process id {pid_raw:?} in {}", repo.display());
            return None;
        }
    };
    if !is_alive(process_id) {
        return None;
    }

    let remote_is_file =
        parse_bool_metadata(&git::get_metadata(runner, repo, "remoteIsFile")).unwrap_or(false);
    let sync_state = if git::status(runner, repo).is_clean() {
        SyncState::Synced
    } else {
        SyncState::Unsynced
    };

    Some(Session {
        process_id,
        repo_path: repo.to_path_buf(),
        clone_url: git::get_metadata(runner, repo, "cloneUrl"),
        remote_path: git::get_metadata(runner, repo, "remotePath"),
        remote_is_file,
        sync_state,
    })
}

/// Finds the session with the given pid, or [`Error::SessionNotFound`].
pub fn find_session(runner: &dyn CommandRunner, workdir: &Path, pid: i32) -> Result<Session> {
    get_sessions(runner, workdir)?
        .into_iter()
        .find(|s| s.process_id == pid)
        .ok_or(Error::SessionNotFound { session: pid })
}

/// Asks a session's daemon to stop (the daemon tears down both sides).
pub fn stop(session: &Session) -> Result<()> {
    kill(Pid::from_raw(session.process_id), Signal::SIGTERM).map_err(|e| Error::CommandFailed {
        command: format!("kill -TERM {}", session.process_id),
        message: e.to_string(),
    })
}
