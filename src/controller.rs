//! External control of a worker's status
//!
//! Three signals drive the state machine:
//! - SIGUSR1: break (Working/OnBreak -> OnBreak)
//! - SIGUSR2: resume (OnBreak/Working -> Working)
//! - SIGTERM: terminate (any -> Stopped, clears `running`)
//!
//! `Stopped` is terminal. Signals are not handled in the interrupted context:
//! `signal-hook` queues them from an async-signal-safe handler and a
//! dedicated listener thread applies them. The listener only takes the lock
//! and assigns the status; it never logs or allocates per signal.

use crate::error::{SetupError, ShutdownError};
use crate::record::WorkerStatus;
use crate::segment::RecordStore;
use crate::state::StateLock;

use signal_hook::consts::{SIGTERM, SIGUSR1, SIGUSR2};
use signal_hook::iterator::{Handle, Signals};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Signals the listener subscribes to
pub const CONTROL_SIGNALS: [libc::c_int; 3] = [SIGUSR1, SIGUSR2, SIGTERM];

/// Control event requested from outside the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Break,
    Resume,
    Terminate,
}

impl ControlEvent {
    pub fn from_signal(signal: libc::c_int) -> Option<Self> {
        match signal {
            SIGUSR1 => Some(ControlEvent::Break),
            SIGUSR2 => Some(ControlEvent::Resume),
            SIGTERM => Some(ControlEvent::Terminate),
            _ => None,
        }
    }
}

/// Applies `event` in a single critical section
///
/// Returns the status in effect afterwards.
pub fn apply<S: RecordStore>(state: &StateLock<S>, event: ControlEvent) -> WorkerStatus {
    state.with(|guarded| match event {
        ControlEvent::Break => guarded.record_mut().set_status(WorkerStatus::OnBreak),
        ControlEvent::Resume => guarded.record_mut().set_status(WorkerStatus::Working),
        ControlEvent::Terminate => {
            guarded.stop();
            WorkerStatus::Stopped
        }
    })
}

/// Installs the handlers for the control signals
///
/// Signals arriving from here on are queued until a `SignalListener` takes
/// them, instead of getting the default disposition (which would kill the
/// process without releasing the segment).
///
/// # Errors
/// `SetupError::TaskSpawn` if the handlers cannot be installed.
pub fn register_signals() -> Result<Signals, SetupError> {
    Signals::new(CONTROL_SIGNALS).map_err(|source| SetupError::TaskSpawn {
        task: "signal listener",
        source,
    })
}

/// Listener thread feeding control signals into the state machine
pub struct SignalListener {
    handle: Handle,
    thread: JoinHandle<()>,
}

impl SignalListener {
    /// Starts the listener thread on already registered signals
    ///
    /// Anything queued since `register_signals` is applied first.
    ///
    /// # Errors
    /// `SetupError::TaskSpawn` if the thread cannot be created.
    pub fn spawn<S>(mut signals: Signals, state: Arc<StateLock<S>>) -> Result<Self, SetupError>
    where
        S: RecordStore + 'static,
    {
        let handle = signals.handle();

        let thread = thread::Builder::new()
            .name("signal-listener".to_string())
            .spawn(move || {
                for signal in signals.forever() {
                    if let Some(event) = ControlEvent::from_signal(signal) {
                        apply(&state, event);
                    }
                }
            })
            .map_err(|source| SetupError::TaskSpawn {
                task: "signal listener",
                source,
            })?;

        Ok(SignalListener { handle, thread })
    }

    /// Stops listening and joins the thread
    pub fn stop(self) -> Result<(), ShutdownError> {
        self.handle.close();
        self.thread
            .join()
            .map_err(|_| ShutdownError::TaskJoin("signal listener"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::HeapRecord;

    fn new_state() -> StateLock<HeapRecord> {
        StateLock::new(HeapRecord::new()).unwrap()
    }

    #[test]
    fn test_signal_mapping() {
        assert_eq!(ControlEvent::from_signal(SIGUSR1), Some(ControlEvent::Break));
        assert_eq!(ControlEvent::from_signal(SIGUSR2), Some(ControlEvent::Resume));
        assert_eq!(ControlEvent::from_signal(SIGTERM), Some(ControlEvent::Terminate));
        assert_eq!(ControlEvent::from_signal(libc::SIGHUP), None);
    }

    #[test]
    fn test_break_and_resume() {
        let state = new_state();
        assert_eq!(apply(&state, ControlEvent::Break), WorkerStatus::OnBreak);
        assert!(state.is_running());
        assert_eq!(apply(&state, ControlEvent::Resume), WorkerStatus::Working);
        assert!(state.is_running());
    }

    #[test]
    fn test_repeated_events_are_idempotent() {
        let state = new_state();
        state.with(|guarded| {
            for _ in 0..3 {
                guarded.record_mut().accrue();
            }
        });

        apply(&state, ControlEvent::Break);
        let on_break = state.snapshot();
        apply(&state, ControlEvent::Break);
        assert_eq!(state.snapshot(), on_break);

        apply(&state, ControlEvent::Resume);
        let working = state.snapshot();
        apply(&state, ControlEvent::Resume);
        assert_eq!(state.snapshot(), working);
        assert_eq!(working.hours_worked(), 3);
        assert_eq!(working.salary(), 30.0);
    }

    #[test]
    fn test_terminate_is_terminal() {
        let state = new_state();
        apply(&state, ControlEvent::Break);
        assert_eq!(apply(&state, ControlEvent::Terminate), WorkerStatus::Stopped);
        assert!(!state.is_running());

        assert_eq!(apply(&state, ControlEvent::Resume), WorkerStatus::Stopped);
        assert_eq!(apply(&state, ControlEvent::Break), WorkerStatus::Stopped);
        assert_eq!(apply(&state, ControlEvent::Terminate), WorkerStatus::Stopped);
        assert!(!state.is_running());
    }
}
