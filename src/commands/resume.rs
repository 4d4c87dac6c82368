//! `xeno resume` — reopens the editor for an active session.
//!
//! The daemon keeps syncing whether or not an editor is open; resume is for
//! getting back to a session whose editor was closed (or that was started
//! from a different terminal).

use crate::config::Config;
use crate::editor;
use crate::error::{Error, Result};
use crate::runner::CommandRunner;
use crate::sessions;
use crate::workdir;

/// Returns the process exit code (the editor's own).
pub fn run(runner: &dyn CommandRunner, config: &Config, session_id: i32) -> Result<i32> {
    if !sessions::is_alive(session_id) {
        return Err(Error::DeadSession {
            session: session_id,
        });
    }

    let workdir = workdir::working_directory(config)?;
    let session = sessions::find_session(runner, &workdir, session_id)?;

    let status = editor::run(runner, config, &session.editable_path())?;
    Ok(status.code().unwrap_or(1))
}
