//! Process daemonization and sync-daemon lifecycle helpers.
//!
//! Three concerns live here:
//! - [`daemonize`]: the classic double fork that detaches the sync loop
//!   from its launching shell.
//! - the shutdown flag: `SIGINT`/`SIGTERM` handlers set an atomic flag; the
//!   loop polls it so cleanup runs exactly once, on the main thread, no
//!   matter how many signals arrive.
//! - [`spawn_sync_daemon`]: re-invokes the current binary's `sync`
//!   subcommand and waits for the handshake line naming the editable path.

use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::sys::stat::{umask, Mode};
use nix::unistd::{chdir, fork, setsid, ForkResult};

use crate::error::{Error, Result};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

extern "C" fn note_shutdown(_signal: libc::c_int) {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

/// Installs `SIGINT`/`SIGTERM` handlers that request a shutdown.
pub fn install_shutdown_handlers() -> Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(note_shutdown),
        SaFlags::empty(),
        SigSet::empty(),
    );
    for signal in [Signal::SIGINT, Signal::SIGTERM] {
        unsafe { sigaction(signal, &action) }.map_err(std::io::Error::from)?;
    }
    Ok(())
}

/// Whether a shutdown signal has been received.
pub fn shutdown_requested() -> bool {
    SHUTDOWN.load(Ordering::SeqCst)
}

/// Sleeps for `duration` in short slices, returning early (true) when a
/// shutdown is requested.
pub fn interruptible_sleep(duration: Duration) -> bool {
    const SLICE: Duration = Duration::from_millis(200);
    let mut remaining = duration;
    while !remaining.is_zero() {
        if shutdown_requested() {
            return true;
        }
        let step = remaining.min(SLICE);
        std::thread::sleep(step);
        remaining -= step;
    }
    shutdown_requested()
}

/// Forks the process into a daemon.
///
/// The double fork detaches from the controlling terminal: the first child
/// becomes a session leader and the second can never reacquire a tty. Both
/// parents exit immediately; only the final child returns from this
/// function, with cwd `/`, a clear umask, and stdio pointed at the null
/// device. Callers must flush anything they still want on stdout *before*
/// calling this.
pub fn daemonize() -> Result<()> {
    match unsafe { fork() }.map_err(std::io::Error::from)? {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => {}
    }

    setsid().map_err(std::io::Error::from)?;
    chdir("/").map_err(std::io::Error::from)?;
    umask(Mode::empty());

    match unsafe { fork() }.map_err(std::io::Error::from)? {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => {}
    }

    redirect_stdio_to_null()
}

fn redirect_stdio_to_null() -> Result<()> {
    let null = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/null")?;
    let fd = std::os::fd::AsRawFd::as_raw_fd(&null);
    for target in 0..=2 {
        if unsafe { libc::dup2(fd, target) } < 0 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }
    }
    Ok(())
}

/// Starts a sync daemon for `clone_url` and returns the editable local path
/// it announces.
///
/// The child is this same binary running `sync`; it prints one line (the
/// editable path) and then daemonizes, so waiting on it returns promptly
/// while the detached grandchild keeps syncing.
pub fn spawn_sync_daemon(
    remote_is_file: bool,
    remote_path: &str,
    clone_url: &str,
) -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let mut command = Command::new(exe);
    command
        .arg("sync")
        .arg("--remote-path")
        .arg(remote_path)
        .arg("--clone-url")
        .arg(clone_url);
    if remote_is_file {
        command.arg("--file");
    }

    let mut child = command
        .stdout(Stdio::piped())
        .stdin(Stdio::null())
        .spawn()
        .map_err(|e| Error::TokenHandshake {
            reason: format!("unable to start the sync daemon: {e}"),
        })?;

    let stdout = child.stdout.take().expect("stdout was piped");
    // The direct child exits once the daemon has forked away; reap it first
    // so a crash surfaces as a handshake failure rather than a hang.
    let status = child.wait()?;

    let mut line = String::new();
    BufReader::new(stdout).read_line(&mut line)?;
    let editable = line.trim();

    if editable.is_empty() {
        return Err(Error::TokenHandshake {
            reason: if status.success() {
                "sync daemon produced no editable path".to_string()
            } else {
                format!("sync daemon exited with {status}")
            },
        });
    }
    Ok(PathBuf::from(editable))
}
