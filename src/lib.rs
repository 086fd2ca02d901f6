//! Payroll Worker Library
//!
//! A worker process keeps its live state (status, hours worked, salary) in a
//! System V shared memory segment keyed by the worker id. The main thread
//! runs the accrual loop, a background thread pays overtime bonuses, and a
//! signal listener thread applies break/resume/terminate requests. All three
//! go through one lock guarding the record and the `running` flag.

pub mod accrual;
pub mod bonus;
pub mod cli;
pub mod config;
pub mod controller;
pub mod daemon;
pub mod error;
pub mod logging;
pub mod record;
pub mod segment;
pub mod shutdown;
pub mod state;
pub mod worker;

pub use cli::parse_args;
pub use config::WorkerConfig;
pub use controller::{apply, ControlEvent, SignalListener};
pub use error::{LoggingError, SetupError, ShutdownError};
pub use logging::{log, set_log_file, StatusLog};
pub use record::{WorkerRecord, WorkerStatus};
pub use segment::{HeapRecord, RecordStore, Segment, SegmentHandle, SegmentView};
pub use state::StateLock;
pub use worker::Worker;

/// Name of the program used in usage and version output
pub const PROGRAM_NAME: &str = "payroll-worker";

/// Current version of the program (from Cargo.toml)
pub const PROGRAM_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Worker identifier given on the command line
pub type WorkerId = u32;
