//! Thin typed facade over the git command line.
//!
//! Every operation the rest of the crate needs is a small function here that
//! builds an argument list and hands it to [`CommandRunner::run_git`]. The
//! functions are deliberately dumb: policy (when to push, what to commit)
//! lives in the callers, and failures map to [`Error::Vcs`] with the stage
//! name unless the operation is documented as best-effort.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::runner::{CommandOutput, CommandRunner};

/// Author recorded on every commit this tool creates.
pub const COMMIT_AUTHOR: &str = "xeno <xeno@xeno>";

/// Message used for ordinary sync-loop commits.
pub const SYNC_COMMIT_MESSAGE: &str = "xeno-commit";

/// Sentinel message that tells the remote hook to tear the repository down.
pub const SELF_DESTRUCT_MESSAGE: &str = "xeno-destruct";

/// Replacement receive program used for sync pushes; the remote shell splits
/// this into the `xeno` binary and its `receive-pack` subcommand.
pub const RECEIVE_PACK_PROGRAM: &str = "xeno receive-pack";

/// Work-tree changes classified from `git status --porcelain`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WorkTreeStatus {
    pub created: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
}

impl WorkTreeStatus {
    pub fn is_clean(&self) -> bool {
        self.created.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}

/// Which change categories a commit may pick up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitFilter {
    pub created: bool,
    pub modified: bool,
    pub deleted: bool,
}

impl CommitFilter {
    /// The filter a sync session uses: single-file sessions only ever commit
    /// modifications (creations and deletions of siblings are excluded),
    /// directory sessions commit all three.
    pub fn for_session(remote_is_file: bool) -> Self {
        Self {
            created: !remote_is_file,
            modified: true,
            deleted: !remote_is_file,
        }
    }

    /// Everything: used for initial commits and the remote pre-receive
    /// check-in.
    pub fn everything() -> Self {
        Self {
            created: true,
            modified: true,
            deleted: true,
        }
    }
}

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// `-c` identity overrides so commits succeed on hosts where git has no
/// configured user. The recorded author stays [`COMMIT_AUTHOR`].
fn identity_args() -> Vec<String> {
    args(&["-c", "user.name=xeno", "-c", "user.email=xeno@xeno"])
}

fn expect_success(output: CommandOutput, stage: &'static str) -> Result<()> {
    if output.status.success() {
        Ok(())
    } else {
        Err(Error::Vcs {
            stage,
            message: output.stderr.trim().to_string(),
        })
    }
}

/// Initializes a repository at `repo` whose work tree is `work_tree`.
pub fn init(runner: &dyn CommandRunner, repo: &Path, work_tree: &Path) -> Result<()> {
    let argv = vec![
        "--work-tree".to_string(),
        work_tree.display().to_string(),
        "--git-dir".to_string(),
        repo.display().to_string(),
        "init".to_string(),
        "--quiet".to_string(),
    ];
    expect_success(runner.run_git(None, &argv)?, "init")
}

/// Clones `url` into `dest`, which must not exist.
pub fn clone(runner: &dyn CommandRunner, url: &str, dest: &Path) -> Result<()> {
    let argv = vec![
        "clone".to_string(),
        "--quiet".to_string(),
        url.to_string(),
        dest.display().to_string(),
    ];
    expect_success(runner.run_git(None, &argv)?, "clone")
}

/// Creates branch `name` at the current head.
pub fn branch(runner: &dyn CommandRunner, repo: &Path, name: &str) -> Result<()> {
    expect_success(
        runner.run_git(Some(repo), &args(&["branch", name]))?,
        "branch",
    )
}

/// Classifies work-tree changes. Errors are non-fatal: a failed status reads
/// as "no changes" and is logged at debug level.
pub fn status(runner: &dyn CommandRunner, repo: &Path) -> WorkTreeStatus {
    let mut result = WorkTreeStatus::default();
    let output = match runner.run_git(Some(repo), &args(&["status", "--porcelain"])) {
        Ok(output) if output.status.success() => output,
        Ok(output) => {
            debug!("git status failed: {}", output.stderr.trim());
            return result;
        }
        Err(e) => {
            debug!("git status failed: {e}");
            return result;
        }
    };

    for line in output.stdout.lines() {
        let Some((code, path)) = line.trim().split_once(' ') else {
            continue;
        };
        let path = path.trim_start().to_string();
        match code {
            "??" => result.created.push(path),
            "M" => result.modified.push(path),
            "D" => result.deleted.push(path),
            _ => {}
        }
    }
    result
}

/// Stages `paths` for addition. Best-effort: failures are logged, not
/// returned.
pub fn add(runner: &dyn CommandRunner, repo: &Path, paths: &[String]) {
    let mut argv = args(&["add"]);
    argv.extend_from_slice(paths);
    match runner.run_git(Some(repo), &argv) {
        Ok(output) if !output.status.success() => {
            debug!("git add failed: {}", output.stderr.trim());
        }
        Err(e) => debug!("git add failed: {e}"),
        _ => {}
    }
}

/// Stages `paths` for removal. Best-effort.
pub fn rm(runner: &dyn CommandRunner, repo: &Path, paths: &[String]) {
    let mut argv = args(&["rm"]);
    argv.extend_from_slice(paths);
    match runner.run_git(Some(repo), &argv) {
        Ok(output) if !output.status.success() => {
            debug!("git rm failed: {}", output.stderr.trim());
        }
        Err(e) => debug!("git rm failed: {e}"),
        _ => {}
    }
}

/// Stages and commits work-tree changes selected by `filter`.
///
/// Paths from [`status`] are work-tree-relative; they are joined onto the
/// repository's `core.worktree` (empty when repo and work tree coincide) so
/// the add/rm calls resolve no matter where the work tree sits relative to
/// the repository directory.
///
/// Returns `true` if a commit was created. With `allow_empty`, a commit is
/// attempted even when nothing was staged (and an empty `message` is
/// permitted).
pub fn commit_changes(
    runner: &dyn CommandRunner,
    repo: &Path,
    filter: CommitFilter,
    message: &str,
    allow_empty: bool,
) -> bool {
    let work_tree = get_config(runner, repo, "core.worktree");
    let qualify = |paths: &[String]| -> Vec<String> {
        paths
            .iter()
            .map(|p| {
                if work_tree.is_empty() {
                    p.clone()
                } else {
                    PathBuf::from(&work_tree).join(p).display().to_string()
                }
            })
            .collect()
    };

    let changes = status(runner, repo);
    let mut staged = false;

    if filter.created && !changes.created.is_empty() {
        add(runner, repo, &qualify(&changes.created));
        staged = true;
    }
    if filter.modified && !changes.modified.is_empty() {
        add(runner, repo, &qualify(&changes.modified));
        staged = true;
    }
    if filter.deleted && !changes.deleted.is_empty() {
        rm(runner, repo, &qualify(&changes.deleted));
        staged = true;
    }

    if !staged && !allow_empty {
        return false;
    }

    let mut argv = identity_args();
    argv.extend(args(&[
        "commit",
        "--quiet",
        "-a",
        "--author",
        COMMIT_AUTHOR,
        "-m",
        message,
    ]));
    if allow_empty {
        argv.push("--allow-empty".to_string());
    }
    if message.is_empty() {
        argv.push("--allow-empty-message".to_string());
    }

    match runner.run_git(Some(repo), &argv) {
        Ok(output) if output.status.success() => true,
        Ok(output) => {
            debug!("git commit failed: {}", output.stderr.trim());
            false
        }
        Err(e) => {
            debug!("git commit failed: {e}");
            false
        }
    }
}

/// Creates an empty commit carrying `message`.
pub fn commit_empty(runner: &dyn CommandRunner, repo: &Path, message: &str) -> Result<()> {
    let mut argv = identity_args();
    argv.extend(args(&[
        "commit",
        "--quiet",
        "--allow-empty",
        "--author",
        COMMIT_AUTHOR,
        "-m",
        message,
    ]));
    expect_success(runner.run_git(Some(repo), &argv)?, "commit")
}

/// Pushes `master:incoming` to origin, optionally through a replacement
/// receive program on the remote side.
pub fn push_incoming(
    runner: &dyn CommandRunner,
    repo: &Path,
    receive_pack: Option<&str>,
) -> Result<()> {
    let mut argv = args(&["push", "--quiet"]);
    if let Some(program) = receive_pack {
        argv.push("--receive-pack".to_string());
        argv.push(program.to_string());
    }
    argv.push("origin".to_string());
    argv.push("master:incoming".to_string());
    expect_success(runner.run_git(Some(repo), &argv)?, "push")
}

/// Pulls from origin with the local-wins conflict policy baked into the
/// options: recursive strategy, `ours` on conflict, no editor.
pub fn pull_local_wins(runner: &dyn CommandRunner, repo: &Path) -> Result<()> {
    let argv = args(&[
        "pull",
        "--quiet",
        "--commit",
        "--no-edit",
        "--strategy",
        "recursive",
        "-X",
        "ours",
    ]);
    expect_success(runner.run_git(Some(repo), &argv)?, "pull")
}

/// Returns whether the work tree differs from `other_ref` (i.e. there is
/// something an empty-handed iteration would still need to push). Errors
/// read as "no".
pub fn has_diverged(runner: &dyn CommandRunner, repo: &Path, other_ref: &str) -> bool {
    match runner.run_git(Some(repo), &args(&["diff", "--shortstat", other_ref])) {
        Ok(output) if output.status.success() => !output.stdout.trim().is_empty(),
        _ => false,
    }
}

/// Sets a key in the repository's namespaced metadata section.
pub fn set_metadata(runner: &dyn CommandRunner, repo: &Path, key: &str, value: &str) -> Result<()> {
    let argv = vec!["config".to_string(), format!("xeno.{key}"), value.to_string()];
    expect_success(runner.run_git(Some(repo), &argv)?, "config")
}

/// Reads a key from the namespaced metadata section; unset keys (and any
/// error) read as an empty string.
pub fn get_metadata(runner: &dyn CommandRunner, repo: &Path, key: &str) -> String {
    get_config(runner, repo, &format!("xeno.{key}"))
}

/// Reads an arbitrary config key (used for `core.worktree`); unset or
/// failing reads are an empty string.
pub fn get_config(runner: &dyn CommandRunner, repo: &Path, full_key: &str) -> String {
    match runner.run_git(Some(repo), &args(&["config", full_key])) {
        Ok(output) if output.status.success() => output.stdout.trim().to_string(),
        _ => String::new(),
    }
}

/// Constructs the ssh clone URL for a repository on a remote host:
/// `ssh://[user@]host[:port]/repo_path`.
pub fn clone_url(user: Option<&str>, host: &str, port: Option<u16>, repo_path: &str) -> String {
    let user = match user.filter(|u| !u.is_empty()) {
        Some(user) => format!("{user}@"),
        None => String::new(),
    };
    let port = match port {
        Some(port) => format!(":{port}"),
        None => String::new(),
    };
    format!("ssh://{user}{host}{port}/{}", repo_path.trim_start_matches('/'))
}

/// Pushes the self-destruct sentinel to the remote. Best-effort: the remote
/// answers a successful destruct with a dying connection, so failures are
/// logged and swallowed.
pub fn self_destruct(runner: &dyn CommandRunner, repo: &Path) {
    if let Err(e) = commit_empty(runner, repo, SELF_DESTRUCT_MESSAGE) {
        warn!("unable to create self-destruct commit: {e}");
        return;
    }
    if let Err(e) = push_incoming(runner, repo, None) {
        warn!("unable to self-destruct remote repository: {e}");
    }
}
