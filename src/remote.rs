//! Remote-side repository construction.
//!
//! This runs on the machine that owns the files being edited, invoked over
//! ssh by the local driver. It prepares a repository the local side can
//! clone: a git dir under the working directory whose work tree is the
//! target path, seeded with an initial commit, an `incoming` branch, and
//! the post-receive hook. The caller announces the result by printing a
//! discovery token.

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::git::{self, CommitFilter};
use crate::hooks;
use crate::runner::CommandRunner;

/// Nested version-control directories that must never ride along when a
/// whole directory is shared.
const FOREIGN_VCS_DIRS: [&str; 3] = [".git", ".svn", ".hg"];

/// A freshly built remote repository.
#[derive(Debug)]
pub struct RemoteRepository {
    /// Canonicalized target path.
    pub path: PathBuf,
    pub is_file: bool,
    /// The git directory under the working directory.
    pub repo_path: PathBuf,
}

/// Builds the remote repository for `target` inside `workdir`.
///
/// `extra_excludes` are caller-supplied patterns in git's exclude-file
/// grammar; they are appended after the generated rules so `!` re-inclusions
/// can override them. Any failure after the git dir is created rolls the
/// directory back.
pub fn build(
    runner: &dyn CommandRunner,
    workdir: &Path,
    target: &str,
    extra_excludes: &[String],
) -> Result<RemoteRepository> {
    let path = resolve_target(target)?;
    // Canonicalize the working directory too, so the repo-under-work-tree
    // check below compares like with like.
    let workdir = std::fs::canonicalize(workdir).unwrap_or_else(|_| workdir.to_path_buf());
    let is_file = path.is_file();
    let work_tree = if is_file {
        path.parent()
            .ok_or_else(|| Error::PathMissing { path: path.clone() })?
            .to_path_buf()
    } else {
        path.clone()
    };

    let repo_path = workdir.join(format!("remote-{}", Uuid::new_v4().simple()));

    git::init(runner, &repo_path, &work_tree)?;

    // Everything after init cleans up the half-built repository on failure.
    let result = populate(runner, &repo_path, &path, &work_tree, is_file, extra_excludes);
    if let Err(e) = result {
        debug!("rolling back {}", repo_path.display());
        let _ = std::fs::remove_dir_all(&repo_path);
        return Err(e);
    }

    Ok(RemoteRepository {
        path,
        is_file,
        repo_path,
    })
}

fn populate(
    runner: &dyn CommandRunner,
    repo_path: &Path,
    path: &Path,
    work_tree: &Path,
    is_file: bool,
    extra_excludes: &[String],
) -> Result<()> {
    write_excludes(repo_path, path, work_tree, is_file, extra_excludes)?;

    if !git::commit_changes(runner, repo_path, CommitFilter::everything(), "", true) {
        return Err(Error::Vcs {
            stage: "commit",
            message: "unable to create the initial commit".to_string(),
        });
    }

    git::branch(runner, repo_path, "incoming")?;
    install_post_receive_hook(repo_path)?;
    Ok(())
}

/// Expands a leading `~` and canonicalizes; the target must exist.
fn resolve_target(target: &str) -> Result<PathBuf> {
    let expanded = match target.strip_prefix("~") {
        Some(rest) => {
            let home = dirs::home_dir().ok_or_else(|| Error::Config {
                reason: "cannot determine the home directory".to_string(),
            })?;
            home.join(rest.trim_start_matches('/'))
        }
        None => PathBuf::from(target),
    };
    std::fs::canonicalize(&expanded).map_err(|_| Error::PathMissing { path: expanded })
}

/// Appends exclusion rules to `info/exclude`.
///
/// Single-file targets exclude everything except the file itself. Directory
/// targets exclude the repository's own directory when it happens to live
/// under the work tree, plus nested foreign VCS directories. Caller patterns
/// go last so git's last-match-wins rule lets them override.
fn write_excludes(
    repo_path: &Path,
    path: &Path,
    work_tree: &Path,
    is_file: bool,
    extra_excludes: &[String],
) -> Result<()> {
    let mut rules = Vec::new();

    if is_file {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::PathMissing {
                path: path.to_path_buf(),
            })?;
        rules.push("*".to_string());
        rules.push(format!("!{name}"));
    } else {
        if let Ok(relative) = repo_path.strip_prefix(work_tree) {
            rules.push(relative.display().to_string());
        }
        for dir in FOREIGN_VCS_DIRS {
            rules.push(dir.to_string());
        }
    }
    rules.extend_from_slice(extra_excludes);

    let info_dir = repo_path.join("info");
    std::fs::create_dir_all(&info_dir)?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(info_dir.join("exclude"))?;
    for rule in rules {
        writeln!(file, "{rule}")?;
    }
    Ok(())
}

/// Writes `hooks/post-receive` with owner-only permissions (0700).
fn install_post_receive_hook(repo_path: &Path) -> Result<()> {
    let hooks_dir = repo_path.join("hooks");
    std::fs::create_dir_all(&hooks_dir)?;
    let hook_path = hooks_dir.join("post-receive");
    std::fs::write(&hook_path, hooks::post_receive_script())?;
    std::fs::set_permissions(&hook_path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
