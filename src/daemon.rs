//! Detaching the worker from its controlling terminal
//!
//! Must run before any thread is spawned: only the calling thread survives
//! `fork()`.

use crate::error::SetupError;

use nix::unistd::{fork, setsid, ForkResult};
use std::fs::OpenOptions;
use std::io;
use std::os::unix::io::AsRawFd;
use std::process;

/// Forks, lets the parent exit 0, and makes the child a session leader
/// with stdin/stdout/stderr pointing at `/dev/null`
pub fn daemonize() -> Result<(), SetupError> {
    match unsafe { fork() } {
        Ok(ForkResult::Parent { .. }) => process::exit(0),
        Ok(ForkResult::Child) => {}
        Err(e) => return Err(SetupError::Daemonize(format!("fork: {}", e))),
    }

    setsid().map_err(|e| SetupError::Daemonize(format!("setsid: {}", e)))?;

    redirect_stdio().map_err(|e| SetupError::Daemonize(format!("redirect stdio: {}", e)))
}

fn redirect_stdio() -> io::Result<()> {
    let null = OpenOptions::new().read(true).write(true).open("/dev/null")?;
    for fd in [libc::STDIN_FILENO, libc::STDOUT_FILENO, libc::STDERR_FILENO] {
        if unsafe { libc::dup2(null.as_raw_fd(), fd) } == -1 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}
