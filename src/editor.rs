//! Editor resolution and launching.
//!
//! The editor comes from `core.editor`, falling back to the `EDITOR`
//! environment variable. Whether a missing editor is fatal depends on the
//! caller: `edit` and `resume` fail, while the ssh interceptor must leave
//! the shell session intact and only warns.

use std::path::Path;
use std::process::ExitStatus;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::runner::CommandRunner;

/// Resolves the editor command, or [`Error::EditorUnavailable`].
pub fn resolve(config: &Config) -> Result<String> {
    if let Some(editor) = config.editor() {
        return Ok(editor);
    }
    match std::env::var("EDITOR") {
        Ok(editor) if !editor.is_empty() => Ok(editor),
        _ => Err(Error::EditorUnavailable),
    }
}

/// Launches the editor on `path` and waits for it to finish.
pub fn run(runner: &dyn CommandRunner, config: &Config, path: &Path) -> Result<ExitStatus> {
    let editor = resolve(config)?;
    runner.run_interactive(&editor, &[path.display().to_string()])
}
