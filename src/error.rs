//! Error types for worker setup, status logging and shutdown
//!
//! Setup errors are fatal and end the process with exit code 1.
//! Logging errors are reported and the accrual loop keeps going.
//! Shutdown errors are reported and then swallowed.

use std::io;
use thiserror::Error;

/// Failure while bringing the worker up
#[derive(Debug, Error)]
pub enum SetupError {
    /// Key derivation, token file or shared segment creation failed
    #[error("segment allocation failed: {0}")]
    SegmentAllocation(String),

    /// State lock could not be built (e.g. the store is unusable)
    #[error("state lock initialization failed: {0}")]
    LockInit(String),

    /// Background thread could not be started
    #[error("failed to spawn {task} task: {source}")]
    TaskSpawn {
        task: &'static str,
        #[source]
        source: io::Error,
    },

    /// Fork/setsid failed while detaching from the terminal
    #[error("failed to daemonize: {0}")]
    Daemonize(String),

    /// Invalid environment configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Failure writing a status line; never fatal
#[derive(Debug, Error)]
#[error("failed to write status log {path}: {source}")]
pub struct LoggingError {
    pub path: String,
    #[source]
    pub source: io::Error,
}

/// Failure in one step of the shutdown sequence
#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("{0} task panicked before it could be joined")]
    TaskJoin(&'static str),

    #[error("state lock still shared by {0} handle(s) at teardown")]
    LockBusy(usize),

    #[error("failed to detach shared segment: {0}")]
    Detach(io::Error),

    #[error("failed to remove shared segment: {0}")]
    Remove(io::Error),
}
