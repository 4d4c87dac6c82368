//! `xeno sync` — the local synchronization daemon.
//!
//! Not meant for direct use: `edit` and the ssh interceptor fork this
//! subcommand. It clones the announced remote repository, prints the
//! editable path for whoever is waiting on the handshake, detaches, and
//! then drives the commit–push–pull loop until signalled. On shutdown it
//! asks the remote to self-destruct and removes its own clone.

use std::io::Write;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::daemon;
use crate::error::Result;
use crate::git::{self, CommitFilter, RECEIVE_PACK_PROGRAM, SYNC_COMMIT_MESSAGE};
use crate::runner::{CommandRunner, ProcessRunner};
use crate::workdir;

/// Inputs of a sync session, as passed on the (internal) command line.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub remote_is_file: bool,
    pub remote_path: String,
    pub clone_url: String,
    /// False keeps the process in the foreground for debugging.
    pub daemonize: bool,
}

/// Runs the sync daemon to completion.
pub fn run(config: &Config, options: &SyncOptions) -> Result<()> {
    let runner = ProcessRunner;
    let workdir = workdir::working_directory(config)?;

    // Each session gets a private container so concurrent sessions on the
    // same remote path cannot collide.
    let container = workdir.join(format!("local-{}", Uuid::new_v4().simple()));
    std::fs::DirBuilder::new()
        .mode(0o700)
        .create(&container)?;

    let (repo, editable) = match create_local_clone(&runner, &container, options) {
        Ok(paths) => paths,
        Err(e) => {
            let _ = std::fs::remove_dir_all(&container);
            return Err(e);
        }
    };

    // Whoever forked us blocks on this line; flush before forking or the
    // daemon inherits the buffered bytes and the parent waits forever.
    println!("{}", editable.display());
    std::io::stdout().flush()?;

    if options.daemonize {
        daemon::daemonize()?;
    }

    // Written after daemonization so it names the long-lived process.
    git::set_metadata(
        &runner,
        &repo,
        "syncProcessId",
        &std::process::id().to_string(),
    )?;

    daemon::install_shutdown_handlers()?;
    run_sync_loop(
        &runner,
        &repo,
        config.sync_interval(),
        config.poll_for_remote_changes(),
        options.remote_is_file,
    );

    info!("shutting down session for {}", options.remote_path);
    cleanup(&runner, &repo, &container);
    Ok(())
}

/// Clones the remote and stamps the session metadata. Returns the repository
/// path and the editable path to announce.
pub fn create_local_clone(
    runner: &dyn CommandRunner,
    container: &Path,
    options: &SyncOptions,
) -> Result<(PathBuf, PathBuf)> {
    let repo = container.join(local_repo_name(options.remote_is_file, &options.remote_path));
    git::clone(runner, &options.clone_url, &repo)?;

    let is_file = if options.remote_is_file { "true" } else { "false" };
    git::set_metadata(runner, &repo, "remoteIsFile", is_file)?;
    git::set_metadata(runner, &repo, "remotePath", &options.remote_path)?;
    // Redundant with origin's URL, but kept for readers that only see the
    // metadata section.
    git::set_metadata(runner, &repo, "cloneUrl", &options.clone_url)?;

    let editable = if options.remote_is_file {
        match Path::new(&options.remote_path).file_name() {
            Some(name) => repo.join(name),
            None => repo.clone(),
        }
    } else {
        repo.clone()
    };
    Ok((repo, editable))
}

/// Names the clone directory: `remote` for file sessions, otherwise the
/// basename of the remote path with any trailing slash normalized away.
pub fn local_repo_name(remote_is_file: bool, remote_path: &str) -> String {
    if remote_is_file {
        return "remote".to_string();
    }
    let trimmed = remote_path.trim_end_matches('/');
    match trimmed.rsplit('/').next() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => "remote".to_string(),
    }
}

fn run_sync_loop(
    runner: &dyn CommandRunner,
    repo: &Path,
    interval: std::time::Duration,
    poll_remote: bool,
    remote_is_file: bool,
) {
    let mut succeeded_last_time = true;
    loop {
        if daemon::shutdown_requested() {
            break;
        }
        succeeded_last_time =
            sync_once(runner, repo, poll_remote, remote_is_file, !succeeded_last_time);
        if daemon::interruptible_sleep(interval) {
            break;
        }
    }
}

/// One iteration of the sync loop. Returns whether the iteration succeeded;
/// a failed iteration biases the next one into an unconditional push.
pub fn sync_once(
    runner: &dyn CommandRunner,
    repo: &Path,
    poll_remote: bool,
    remote_is_file: bool,
    force_push: bool,
) -> bool {
    let committed = git::commit_changes(
        runner,
        repo,
        CommitFilter::for_session(remote_is_file),
        SYNC_COMMIT_MESSAGE,
        false,
    );

    // Push when there is something new, when an earlier push never landed,
    // when the user wants the remote polled, or when the last iteration
    // failed outright.
    let do_push = committed
        || git::has_diverged(runner, repo, "origin/master")
        || poll_remote
        || force_push;
    if !do_push {
        return true;
    }

    if let Err(e) = git::push_incoming(runner, repo, Some(RECEIVE_PACK_PROGRAM)) {
        debug!("sync push failed: {e}");
        return false;
    }
    if let Err(e) = git::pull_local_wins(runner, repo) {
        debug!("sync pull failed: {e}");
        return false;
    }
    true
}

/// Signal-time teardown: ask the remote to destroy itself (best-effort) and
/// remove the local container.
pub fn cleanup(runner: &dyn CommandRunner, repo: &Path, container: &Path) {
    git::self_destruct(runner, repo);
    if let Err(e) = std::fs::remove_dir_all(container) {
        debug!("unable to remove {}: {e}", container.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Invocation, MockResponse, MockRunner};

    fn repo() -> PathBuf {
        PathBuf::from("/w/local-1/project")
    }

    fn options(is_file: bool) -> SyncOptions {
        SyncOptions {
            remote_is_file: is_file,
            remote_path: if is_file {
                "/srv/notes.txt".to_string()
            } else {
                "/srv/project".to_string()
            },
            clone_url: "ssh://host/w/remote-1".to_string(),
            daemonize: false,
        }
    }

    #[test]
    fn repo_name_for_file_session() {
        assert_eq!(local_repo_name(true, "/srv/notes.txt"), "remote");
    }

    #[test]
    fn repo_name_for_directory_session() {
        assert_eq!(local_repo_name(false, "/srv/project"), "project");
    }

    #[test]
    fn repo_name_normalizes_trailing_slashes() {
        assert_eq!(local_repo_name(false, "/srv/project/"), "project");
        assert_eq!(local_repo_name(false, "/srv/project//"), "project");
    }

    #[test]
    fn clone_sets_metadata_and_returns_editable_file() {
        let mock = MockRunner::new();
        mock.add_ok(4); // clone + three metadata writes

        let container = PathBuf::from("/w/local-1");
        let (repo, editable) =
            create_local_clone(&mock, &container, &options(true)).unwrap();

        assert_eq!(repo, PathBuf::from("/w/local-1/remote"));
        assert_eq!(editable, PathBuf::from("/w/local-1/remote/notes.txt"));

        let calls = mock.git_calls();
        assert_eq!(calls[0][0], "clone");
        assert_eq!(calls[1], vec!["config", "xeno.remoteIsFile", "true"]);
        assert_eq!(calls[2], vec!["config", "xeno.remotePath", "/srv/notes.txt"]);
        assert_eq!(
            calls[3],
            vec!["config", "xeno.cloneUrl", "ssh://host/w/remote-1"]
        );
    }

    #[test]
    fn clone_editable_for_directory_is_the_clone_root() {
        let mock = MockRunner::new();
        mock.add_ok(4);

        let container = PathBuf::from("/w/local-1");
        let (repo, editable) =
            create_local_clone(&mock, &container, &options(false)).unwrap();

        assert_eq!(repo, PathBuf::from("/w/local-1/project"));
        assert_eq!(editable, repo);

        let calls = mock.git_calls();
        assert_eq!(calls[1], vec!["config", "xeno.remoteIsFile", "false"]);
    }

    #[test]
    fn clone_failure_propagates() {
        let mock = MockRunner::new();
        mock.add_response(MockResponse::Fail("no route to host".into()));

        assert!(create_local_clone(&mock, Path::new("/w/local-1"), &options(false)).is_err());
    }

    #[test]
    fn quiet_iteration_does_not_push() {
        let mock = MockRunner::new();
        // commit_changes: core.worktree, clean status
        mock.add_response(MockResponse::Ok(String::new()));
        mock.add_response(MockResponse::Ok(String::new()));
        // has_diverged: empty diff
        mock.add_response(MockResponse::Ok(String::new()));

        assert!(sync_once(&mock, &repo(), false, false, false));

        let calls = mock.git_calls();
        assert_eq!(calls.len(), 3);
        assert!(!calls.iter().any(|c| c[0] == "push"));
    }

    #[test]
    fn local_change_commits_pushes_and_pulls() {
        let mock = MockRunner::new();
        // commit_changes: core.worktree, status, add, commit
        mock.add_response(MockResponse::Ok(String::new()));
        mock.add_response(MockResponse::Ok("?? new.txt\n".into()));
        mock.add_ok(2);
        // push, pull
        mock.add_ok(2);

        assert!(sync_once(&mock, &repo(), false, false, false));

        let calls = mock.git_calls();
        let push = calls.iter().find(|c| c[0] == "push").unwrap();
        assert!(push.contains(&RECEIVE_PACK_PROGRAM.to_string()));
        assert!(push.contains(&"master:incoming".to_string()));
        // The pull follows the push.
        assert_eq!(calls.last().unwrap()[0], "pull");
    }

    #[test]
    fn unpushed_commits_force_a_push() {
        let mock = MockRunner::new();
        // commit_changes: core.worktree, clean status
        mock.add_response(MockResponse::Ok(String::new()));
        mock.add_response(MockResponse::Ok(String::new()));
        // has_diverged: non-empty
        mock.add_response(MockResponse::Ok(" 1 file changed\n".into()));
        // push, pull
        mock.add_ok(2);

        assert!(sync_once(&mock, &repo(), false, false, false));
        assert!(mock.git_calls().iter().any(|c| c[0] == "push"));
    }

    #[test]
    fn failed_iteration_biases_the_next_into_a_push() {
        let mock = MockRunner::new();
        // commit_changes: core.worktree, clean status; diff empty; no poll.
        mock.add_response(MockResponse::Ok(String::new()));
        mock.add_response(MockResponse::Ok(String::new()));
        mock.add_response(MockResponse::Ok(String::new()));
        // force_push makes it push anyway.
        mock.add_ok(2);

        assert!(sync_once(&mock, &repo(), false, false, true));
        assert!(mock.git_calls().iter().any(|c| c[0] == "push"));
    }

    #[test]
    fn poll_mode_pushes_even_when_clean() {
        let mock = MockRunner::new();
        mock.add_response(MockResponse::Ok(String::new())); // core.worktree
        mock.add_response(MockResponse::Ok(String::new())); // status
        mock.add_response(MockResponse::Ok(String::new())); // diff
        mock.add_ok(2); // push, pull

        assert!(sync_once(&mock, &repo(), true, false, false));
        assert!(mock.git_calls().iter().any(|c| c[0] == "push"));
    }

    #[test]
    fn push_failure_fails_the_iteration_without_pulling() {
        let mock = MockRunner::new();
        mock.add_response(MockResponse::Ok(String::new())); // core.worktree
        mock.add_response(MockResponse::Ok("?? a\n".into())); // status
        mock.add_ok(2); // add, commit
        mock.add_response(MockResponse::Err("remote hung up".into())); // push

        assert!(!sync_once(&mock, &repo(), false, false, false));
        assert!(!mock.git_calls().iter().any(|c| c[0] == "pull"));
    }

    #[test]
    fn pull_failure_fails_the_iteration() {
        let mock = MockRunner::new();
        mock.add_response(MockResponse::Ok(String::new())); // core.worktree
        mock.add_response(MockResponse::Ok("?? a\n".into())); // status
        mock.add_ok(2); // add, commit
        mock.add_response(MockResponse::Ok(String::new())); // push
        mock.add_response(MockResponse::Err("merge failed".into())); // pull

        assert!(!sync_once(&mock, &repo(), false, false, false));
    }

    #[test]
    fn file_session_iteration_ignores_sibling_creations() {
        let mock = MockRunner::new();
        mock.add_response(MockResponse::Ok(String::new())); // core.worktree
        // A sibling file appeared next to the edited one.
        mock.add_response(MockResponse::Ok("?? sibling.txt\n".into()));
        // Nothing to commit, nothing diverged.
        mock.add_response(MockResponse::Ok(String::new())); // diff

        assert!(sync_once(&mock, &repo(), false, true, false));

        // No add, no commit, no push.
        let calls = mock.git_calls();
        assert!(!calls.iter().any(|c| c[0] == "add"));
        assert!(!calls.iter().any(|c| c[0] == "push"));
    }

    #[test]
    fn cleanup_destructs_then_removes_container() {
        let tmp = tempfile::tempdir().unwrap();
        let container = tmp.path().join("local-x");
        let repo = container.join("project");
        std::fs::create_dir_all(&repo).unwrap();

        let mock = MockRunner::new();
        mock.add_ok(2); // destruct commit + push

        cleanup(&mock, &repo, &container);

        assert!(!container.exists());
        let inv = mock.invocations();
        assert!(matches!(&inv[0], Invocation::Git { .. }));
    }

    #[test]
    fn cleanup_removes_container_even_when_destruct_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let container = tmp.path().join("local-x");
        std::fs::create_dir_all(container.join("project")).unwrap();

        let mock = MockRunner::new();
        mock.add_response(MockResponse::Err("gone".into()));

        cleanup(&mock, &container.join("project"), &container);
        assert!(!container.exists());
    }
}
