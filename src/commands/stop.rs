//! `xeno stop` — stops one session or all of them.
//!
//! Stopping means sending `SIGTERM` to the session's daemon; the daemon
//! does the actual teardown (self-destruct push, local cleanup) from its
//! signal-aware loop.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::runner::CommandRunner;
use crate::sessions::{self, Session};
use crate::workdir;

pub fn run(
    runner: &dyn CommandRunner,
    config: &Config,
    all: bool,
    session_id: Option<i32>,
) -> Result<()> {
    let workdir = workdir::working_directory(config)?;
    let sessions = sessions::get_sessions(runner, &workdir)?;

    if all {
        if sessions.is_empty() {
            eprintln!("No active sessions.");
            return Ok(());
        }
        if !confirm_stop_all(sessions.len())? {
            return Ok(());
        }
        return stop_all(&sessions);
    }

    let session_id = session_id.ok_or_else(|| Error::Config {
        reason: "specify a session id or --all".to_string(),
    })?;
    let session = sessions
        .iter()
        .find(|s| s.process_id == session_id)
        .ok_or(Error::SessionNotFound {
            session: session_id,
        })?;
    stop_one(session)
}

fn confirm_stop_all(count: usize) -> Result<bool> {
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(format!("Stop {count} active session(s)?"))
        .default(true)
        .interact()
        .map_err(std::io::Error::other)?;
    Ok(confirmed)
}

/// Stops every session, reporting failures but not aborting on the first.
pub fn stop_all(sessions: &[Session]) -> Result<()> {
    let mut failed = false;
    for session in sessions {
        if let Err(e) = sessions::stop(session) {
            eprintln!("Warning: unable to stop session {}: {e}", session.process_id);
            failed = true;
        } else {
            eprintln!("Stopped session {}.", session.process_id);
        }
    }
    if failed {
        return Err(Error::CommandFailed {
            command: "stop --all".to_string(),
            message: "one or more sessions could not be stopped".to_string(),
        });
    }
    Ok(())
}

pub fn stop_one(session: &Session) -> Result<()> {
    sessions::stop(session)?;
    eprintln!("Stopped session {}.", session.process_id);
    Ok(())
}
