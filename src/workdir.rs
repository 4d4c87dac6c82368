//! Resolution and creation of the xeno working directory.
//!
//! The working directory holds everything xeno owns on a machine: remote
//! repositories (`remote-<uuid>`), local clone containers (`local-<uuid>`),
//! and interceptor pipes (`fifo-<uuid>`). It defaults to `~/.xeno` and can
//! be pointed elsewhere with `core.workingDirectory`.

use std::os::unix::fs::DirBuilderExt;
use std::path::PathBuf;

use crate::config::Config;
use crate::error::{Error, Result};

/// Returns the working directory, creating it (mode 0700) if needed.
pub fn working_directory(config: &Config) -> Result<PathBuf> {
    let path = match config.working_directory() {
        Some(path) => path,
        None => dirs::home_dir()
            .ok_or_else(|| Error::Config {
                reason: "cannot determine the home directory".to_string(),
            })?
            .join(".xeno"),
    };

    if path.exists() {
        if path.is_dir() {
            return Ok(path);
        }
        return Err(Error::WorkdirUnusable {
            path,
            reason: "exists but is not a directory".to_string(),
        });
    }

    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(&path)
        .map_err(|e| Error::WorkdirUnusable {
            path: path.clone(),
            reason: e.to_string(),
        })?;
    Ok(path)
}
