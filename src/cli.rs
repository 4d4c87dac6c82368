//! CLI argument definitions using clap's derive API.
//!
//! This module defines the full command tree. Every subcommand and flag is
//! declared here; the rest of the codebase receives already-parsed structs.
//! `sync` and `receive-pack` are hidden: they exist for the tool to invoke
//! itself (locally when forking a daemon, remotely as the receive program).

use clap::{Parser, Subcommand};

/// Synchronous remote file editing over ssh.
#[derive(Debug, Parser)]
#[command(name = "xeno", version)]
pub struct Cli {
    /// Increase log verbosity (-v = INFO, -vv = DEBUG, -vvv = TRACE).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Maps the verbosity count to a tracing filter level.
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Edit a local or remote path ([[user@]host:[port:]]path).
    Edit {
        /// The path to edit.
        spec: String,

        /// Additional exclude patterns for the remote repository.
        #[arg(short = 'i', long = "ignore")]
        ignore: Vec<String>,
    },

    /// Run ssh, opening an editor whenever the remote side starts an edit.
    Ssh {
        /// Arguments passed through to ssh.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Run a synchronization daemon (not meant for direct use).
    #[command(hide = true)]
    Sync {
        /// The remote path being edited.
        #[arg(short = 'r', long)]
        remote_path: String,

        /// The clone URL of the remote repository.
        #[arg(short = 'c', long)]
        clone_url: String,

        /// The remote path is a single file.
        #[arg(short = 'f', long)]
        file: bool,

        /// Stay in the foreground (for debugging).
        #[arg(long)]
        no_daemon: bool,
    },

    /// List active editing sessions.
    List,

    /// Reopen the editor for an active session.
    Resume {
        /// The session id (the first column of `xeno list`).
        session: i32,
    },

    /// Stop editing sessions.
    Stop {
        /// Stop every active session.
        #[arg(short, long)]
        all: bool,

        /// The session id to stop.
        session: Option<i32>,
    },

    /// View or edit configuration values.
    Config {
        /// Remove the key instead of setting it.
        #[arg(short, long)]
        clear: bool,

        /// The configuration key (section.option).
        key: Option<String>,

        /// The value to set.
        value: Option<String>,
    },

    /// Receive a push, checking in remote work-tree changes first (not
    /// meant for direct use).
    #[command(hide = true, name = "receive-pack")]
    ReceivePack {
        /// Arguments for git-receive-pack; the first non-flag is the
        /// repository path.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}
