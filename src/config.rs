//! Loading, saving, and querying `~/.xenoconfig`.
//!
//! The file is a sectioned key/value store in TOML syntax. A missing file is
//! an empty configuration. Values written through `xeno config` are stored
//! as strings; readers also accept native integers and booleans so a
//! hand-edited file works too.

use std::path::PathBuf;
use std::time::Duration;

use toml::{Table, Value};

use crate::error::{Error, Result};

/// Default seconds between sync iterations.
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 10;

/// In-memory configuration, keyed `section.option`.
#[derive(Debug, Clone, Default)]
pub struct Config {
    table: Table,
}

/// Returns `$HOME/.xenoconfig`.
pub fn config_file_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| Error::Config {
        reason: "cannot determine the home directory".to_string(),
    })?;
    Ok(home.join(".xenoconfig"))
}

impl Config {
    /// Loads the configuration from the default path. A missing file yields
    /// an empty configuration; an unreadable or unparseable one is an error.
    pub fn load() -> Result<Self> {
        let path = config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)?;
        Self::parse(&text)
    }

    pub fn parse(input: &str) -> Result<Self> {
        let table = input.parse::<Table>().map_err(|e| Error::Config {
            reason: e.to_string(),
        })?;
        Ok(Self { table })
    }

    /// Saves the configuration back to the default path.
    pub fn save(&self) -> Result<()> {
        let path = config_file_path()?;
        std::fs::write(&path, self.dump())?;
        Ok(())
    }

    /// Serializes the configuration for display or persistence.
    pub fn dump(&self) -> String {
        toml::to_string(&self.table).expect("config table serializes")
    }

    /// Looks up `section.option`, rendering scalar values as strings.
    pub fn get(&self, section: &str, option: &str) -> Option<String> {
        match self.table.get(section)?.as_table()?.get(option)? {
            Value::String(s) => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Boolean(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Sets `section.option` to a string value, creating the section if
    /// needed.
    pub fn set(&mut self, section: &str, option: &str, value: &str) {
        let entry = self
            .table
            .entry(section.to_string())
            .or_insert_with(|| Value::Table(Table::new()));
        if !entry.is_table() {
            *entry = Value::Table(Table::new());
        }
        entry
            .as_table_mut()
            .expect("entry was just made a table")
            .insert(option.to_string(), Value::String(value.to_string()));
    }

    /// Removes `section.option`. A section left empty is dropped. Returns
    /// whether anything was removed.
    pub fn clear(&mut self, section: &str, option: &str) -> bool {
        let Some(entry) = self.table.get_mut(section).and_then(Value::as_table_mut) else {
            return false;
        };
        let removed = entry.remove(option).is_some();
        if entry.is_empty() {
            self.table.remove(section);
        }
        removed
    }

    /// `core.workingDirectory`, if configured.
    pub fn working_directory(&self) -> Option<PathBuf> {
        self.get("core", "workingDirectory").map(PathBuf::from)
    }

    /// `core.editor`, if configured.
    pub fn editor(&self) -> Option<String> {
        self.get("core", "editor")
    }

    /// `sync.syncInterval` as a duration; unset or unparseable values fall
    /// back to the default.
    pub fn sync_interval(&self) -> Duration {
        let secs = self
            .get("sync", "syncInterval")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_SYNC_INTERVAL_SECS);
        Duration::from_secs(secs)
    }

    /// `sync.pollForRemoteChanges`; unset or unparseable values read false.
    pub fn poll_for_remote_changes(&self) -> bool {
        self.get("sync", "pollForRemoteChanges")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "yes" | "1"))
            .unwrap_or(false)
    }
}
