//! Shared error types used across all xeno modules.
//!
//! Every module returns [`Result<T>`] which uses [`Error`] as the error type.
//! Error messages are user-facing: they name the path, session, or stage that
//! failed and, where there is one, the command that fixes it.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// All errors that xeno can produce.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid path specification {spec:?}: {reason}")]
    InvalidSpecification { spec: String, reason: String },

    #[error("requested path does not exist: {path}")]
    PathMissing { path: PathBuf },

    #[error("working directory {path} is unusable: {reason}")]
    WorkdirUnusable { path: PathBuf, reason: String },

    #[error("git {stage} failed: {message}")]
    Vcs { stage: &'static str, message: String },

    #[error("initialization handshake failed: {reason}")]
    TokenHandshake { reason: String },

    #[error(
        "unable to identify an editor; set the `core.editor` option with \
         `xeno config core.editor <editor>` or export EDITOR"
    )]
    EditorUnavailable,

    #[error("no session with id {session} (see `xeno list`)")]
    SessionNotFound { session: i32 },

    #[error("session {session} is no longer running")]
    DeadSession { session: i32 },

    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("command failed: {command}: {message}")]
    CommandFailed { command: String, message: String },
}
