//! `xeno receive-pack` — the replacement receive program on the remote.
//!
//! Local daemons push with `--receive-pack "xeno receive-pack"`, so this
//! runs on the remote host for every inbound push. It first commits any
//! pending work-tree changes on `master` (edits made directly on the
//! remote during the session must not be lost to the merge) and then
//! replaces itself with the stock `git-receive-pack`, handing over the
//! original arguments untouched.

use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};
use crate::git::{self, CommitFilter, SYNC_COMMIT_MESSAGE};
use crate::runner::CommandRunner;

/// The repository path is the first argument that is not an option; git
/// may pass options of its own before it.
pub fn repo_path_from_args(args: &[String]) -> Option<PathBuf> {
    args.iter()
        .find(|a| !a.starts_with('-'))
        .map(PathBuf::from)
}

/// Commits pending remote-side changes. Best-effort: a failed check-in
/// must not block the push itself.
pub fn check_in_work_tree(runner: &dyn CommandRunner, repo: &Path) {
    // On this side every category is safe to pick up: additions are caught
    // by the excludes, deletions should propagate.
    git::commit_changes(
        runner,
        repo,
        CommitFilter::everything(),
        SYNC_COMMIT_MESSAGE,
        false,
    );
}

/// Runs the shim: check in, then exec `git-receive-pack`. Only returns on
/// exec failure.
pub fn run(runner: &dyn CommandRunner, args: &[String]) -> Result<()> {
    if let Some(repo) = repo_path_from_args(args) {
        check_in_work_tree(runner, &repo);
    }

    let error = Command::new("git-receive-pack").args(args).exec();
    Err(Error::CommandFailed {
        command: "git-receive-pack".to_string(),
        message: error.to_string(),
    })
}
