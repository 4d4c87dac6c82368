//! `xeno list` — lists active editing sessions.
//!
//! One line per live session: the daemon pid (the id every other session
//! command takes), the remote path, the remote host, and whether the clone
//! currently has uncommitted changes.

use crate::config::Config;
use crate::error::Result;
use crate::runner::CommandRunner;
use crate::sessions;
use crate::workdir;

pub fn run(runner: &dyn CommandRunner, config: &Config) -> Result<()> {
    let workdir = workdir::working_directory(config)?;
    let sessions = sessions::get_sessions(runner, &workdir)?;

    if sessions.is_empty() {
        eprintln!("No active sessions.");
        return Ok(());
    }

    for session in sessions {
        println!("{}", format_session(&session));
    }
    Ok(())
}

fn format_session(session: &sessions::Session) -> String {
    format!(
        "{}: {} ({}) [{}]",
        session.process_id,
        session.remote_path,
        session.remote_host(),
        session.sync_state
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::{Session, SyncState};
    use std::path::PathBuf;

    #[test]
    fn session_line_format() {
        let session = Session {
            process_id: 4242,
            repo_path: PathBuf::from("/w/local-1/project"),
            clone_url: "ssh://jacob@myhost/w/remote-1".into(),
            remote_path: "/srv/project".into(),
            remote_is_file: false,
            sync_state: SyncState::Unsynced,
        };
        assert_eq!(
            format_session(&session),
            "4242: /srv/project (jacob@myhost) [unsynced]"
        );
    }

    #[test]
    fn empty_workdir_lists_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.set("core", "workingDirectory", tmp.path().to_str().unwrap());

        let mock = crate::test_support::MockRunner::new();
        run(&mock, &config).unwrap();
        assert!(mock.invocations().is_empty());
    }
}
