//! Test utilities shared across unit tests in multiple modules.
//!
//! This module is only compiled under `#[cfg(test)]`. It provides
//! [`MockRunner`], a configurable fake [`CommandRunner`] that records all
//! invocations and returns pre-configured responses, enabling orchestration
//! tests without real git or ssh.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use crate::error::{Error, Result};
use crate::runner::{CommandOutput, CommandRunner};

/// What kind of command was invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Git {
        cwd: Option<PathBuf>,
        args: Vec<String>,
    },
    Ssh {
        destination: String,
        port: Option<u16>,
        command: String,
    },
    Interactive {
        program: String,
        args: Vec<String>,
    },
}

/// Pre-configured result for a single mock invocation.
pub enum MockResponse {
    /// A successful `CommandOutput` with the given stdout.
    Ok(String),
    /// A `CommandOutput` with a non-zero exit status and the given stderr.
    Fail(String),
    /// An `Err(Error::CommandFailed { .. })`.
    Err(String),
}

/// Creates a successful (code 0) `ExitStatus` by running `true`.
fn success_status() -> ExitStatus {
    std::process::Command::new("true")
        .status()
        .expect("failed to run `true`")
}

/// Creates a failing (non-zero) `ExitStatus` by running `false`.
fn failure_status() -> ExitStatus {
    std::process::Command::new("false")
        .status()
        .expect("failed to run `false`")
}

/// A fake [`CommandRunner`] for unit tests.
///
/// Enqueue expected responses with [`MockRunner::add_response`]. Each call to
/// any `CommandRunner` method pops the next response from the front of the
/// queue and records the invocation. After the test, inspect
/// [`MockRunner::invocations`] to verify the correct commands were issued in
/// the expected order.
///
/// Panics if a method is called with no responses remaining.
pub struct MockRunner {
    invocations: RefCell<Vec<Invocation>>,
    responses: RefCell<Vec<MockResponse>>,
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRunner {
    pub fn new() -> Self {
        Self {
            invocations: RefCell::new(Vec::new()),
            responses: RefCell::new(Vec::new()),
        }
    }

    pub fn add_response(&self, response: MockResponse) {
        self.responses.borrow_mut().push(response);
    }

    /// Enqueues `n` plain successes in a row.
    pub fn add_ok(&self, n: usize) {
        for _ in 0..n {
            self.add_response(MockResponse::Ok(String::new()));
        }
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.borrow().clone()
    }

    /// The git argument lists issued so far, for order assertions.
    pub fn git_calls(&self) -> Vec<Vec<String>> {
        self.invocations()
            .into_iter()
            .filter_map(|i| match i {
                Invocation::Git { args, .. } => Some(args),
                _ => None,
            })
            .collect()
    }

    fn next_response(&self) -> MockResponse {
        let mut responses = self.responses.borrow_mut();
        assert!(
            !responses.is_empty(),
            "MockRunner: no more responses queued (add more with add_response)"
        );
        responses.remove(0)
    }

    fn respond(&self, response: MockResponse) -> Result<CommandOutput> {
        match response {
            MockResponse::Ok(stdout) => Ok(CommandOutput {
                stdout,
                stderr: String::new(),
                status: success_status(),
            }),
            MockResponse::Fail(stderr) => Ok(CommandOutput {
                stdout: String::new(),
                stderr,
                status: failure_status(),
            }),
            MockResponse::Err(message) => Err(Error::CommandFailed {
                command: "mock".to_string(),
                message,
            }),
        }
    }
}

impl CommandRunner for MockRunner {
    fn run_git(&self, cwd: Option<&Path>, args: &[String]) -> Result<CommandOutput> {
        self.invocations.borrow_mut().push(Invocation::Git {
            cwd: cwd.map(Path::to_path_buf),
            args: args.to_vec(),
        });
        let response = self.next_response();
        self.respond(response)
    }

    fn run_ssh(
        &self,
        destination: &str,
        port: Option<u16>,
        command: &str,
    ) -> Result<CommandOutput> {
        self.invocations.borrow_mut().push(Invocation::Ssh {
            destination: destination.to_string(),
            port,
            command: command.to_string(),
        });
        let response = self.next_response();
        self.respond(response)
    }

    fn run_interactive(&self, program: &str, args: &[String]) -> Result<ExitStatus> {
        self.invocations.borrow_mut().push(Invocation::Interactive {
            program: program.to_string(),
            args: args.to_vec(),
        });
        match self.next_response() {
            MockResponse::Ok(_) => Ok(success_status()),
            MockResponse::Fail(_) => Ok(failure_status()),
            MockResponse::Err(message) => Err(Error::CommandFailed {
                command: "mock".to_string(),
                message,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_invocations_in_order() {
        let mock = MockRunner::new();
        mock.add_ok(2);

        mock.run_git(None, &["--version".to_string()]).unwrap();
        mock.run_ssh("user@host", Some(25), "ls").unwrap();

        let inv = mock.invocations();
        assert_eq!(inv.len(), 2);
        assert_eq!(
            inv[0],
            Invocation::Git {
                cwd: None,
                args: vec!["--version".into()]
            }
        );
        assert_eq!(
            inv[1],
            Invocation::Ssh {
                destination: "user@host".into(),
                port: Some(25),
                command: "ls".into()
            }
        );
    }

    #[test]
    fn ok_response_returns_stdout() {
        let mock = MockRunner::new();
        mock.add_response(MockResponse::Ok("hello\n".into()));

        let out = mock.run_git(None, &[]).unwrap();
        assert_eq!(out.stdout, "hello\n");
        assert!(out.status.success());
    }

    #[test]
    fn fail_response_returns_nonzero() {
        let mock = MockRunner::new();
        mock.add_response(MockResponse::Fail("bad".into()));

        let out = mock.run_git(None, &[]).unwrap();
        assert!(!out.status.success());
        assert_eq!(out.stderr, "bad");
    }

    #[test]
    fn err_response_returns_error() {
        let mock = MockRunner::new();
        mock.add_response(MockResponse::Err("boom".into()));

        assert!(mock.run_git(None, &[]).is_err());
    }

    #[test]
    fn interactive_statuses() {
        let mock = MockRunner::new();
        mock.add_response(MockResponse::Ok(String::new()));
        mock.add_response(MockResponse::Fail(String::new()));

        assert!(mock.run_interactive("vim", &[]).unwrap().success());
        assert!(!mock.run_interactive("vim", &[]).unwrap().success());
    }

    #[test]
    #[should_panic(expected = "no more responses queued")]
    fn panics_when_no_responses() {
        let mock = MockRunner::new();
        let _ = mock.run_git(None, &[]);
    }
}
