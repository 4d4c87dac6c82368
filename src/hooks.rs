//! Generation of the `post-receive` hook installed into remote repositories.
//!
//! The hook is the server half of the sync protocol. Every push from a local
//! daemon lands on the `incoming` branch; the hook then either folds the
//! pushed commits into `master` (so the remote work tree and subsequent
//! pulls see a consistent tip) or, when the pushed tip carries the
//! self-destruct message, deletes the repository directory. The work tree is
//! never touched by teardown.
//!
//! The script is plain POSIX sh so it runs on any remote host with git.

use crate::git::SELF_DESTRUCT_MESSAGE;

/// Returns the `post-receive` script content.
///
/// git runs hooks with the repository directory as both cwd and `GIT_DIR`.
/// The environment is cleared before the merge so git rediscovers the
/// repository (and its configured work tree) normally.
pub fn post_receive_script() -> String {
    format!(
        r#"#!/bin/sh
# Fold pushes to 'incoming' into master, or tear the repository down when
# the destruct marker arrives. Installed and owned by xeno.
while read old new ref; do
    [ "$ref" = "refs/heads/incoming" ] || continue
    if [ "$(git log -1 --format=%s "$new")" = "{destruct}" ]; then
        repo_dir="$(pwd -P)"
        cd /
        rm -rf "$repo_dir"
        exit 0
    fi
    unset GIT_DIR GIT_WORK_TREE
    git merge --quiet --no-edit --strategy recursive -X theirs incoming \
        >/dev/null 2>&1
done
exit 0
"#,
        destruct = SELF_DESTRUCT_MESSAGE
    )
}
