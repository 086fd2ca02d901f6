//! Process-wide worker context
//!
//! Startup is split in two so that everything that can fail runs before the
//! process daemonizes and its exit code is still seen by the caller:
//! - `Worker::prepare` installs the signal handlers and creates the shared
//!   segment. No thread exists yet, so it is safe to fork afterwards.
//! - `PreparedWorker::launch` starts the signal listener and the bonus task.
//!
//! `Worker` owns everything the running process shares between tasks: the
//! locked state (record plus `running` flag), the bonus thread and the
//! signal listener. It is torn down once, in `run`.

use crate::accrual;
use crate::bonus::BonusTask;
use crate::config::WorkerConfig;
use crate::controller::{register_signals, SignalListener};
use crate::error::{SetupError, ShutdownError};
use crate::logging::{log, StatusLog};
use crate::segment::{RecordStore, Segment, SegmentHandle};
use crate::shutdown::shutdown;
use crate::state::StateLock;
use crate::WorkerId;

use signal_hook::iterator::Signals;
use std::sync::Arc;

pub struct Worker<S: RecordStore + 'static> {
    id: WorkerId,
    config: WorkerConfig,
    state: Arc<StateLock<S>>,
    bonus: BonusTask,
    listener: Option<SignalListener>,
    status_log: StatusLog,
}

/// Worker with handlers installed and segment initialized, no threads yet
pub struct PreparedWorker {
    id: WorkerId,
    config: WorkerConfig,
    segment: Segment,
    signals: Signals,
}

impl PreparedWorker {
    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    /// Starts the signal listener and the bonus task
    ///
    /// # Errors
    /// `SetupError::TaskSpawn`; threads already started are joined and the
    /// segment is released before returning.
    pub fn launch(self) -> Result<Worker<Segment>, SetupError> {
        Worker::with_store(self.id, self.config, self.segment, Some(self.signals))
    }

    /// Gives up before launching, releasing the segment
    pub fn abort(self) {
        if let Err(e) = self.segment.release() {
            let _ = log(&format!("Worker {}: {}", self.id, e));
        }
    }
}

impl Worker<Segment> {
    /// Installs the control signal handlers, then allocates and initializes
    /// the shared segment
    ///
    /// Handlers go first: a control signal arriving while the segment is
    /// being set up is queued rather than killing the process with the
    /// segment still allocated.
    ///
    /// # Errors
    /// `SetupError::TaskSpawn` if the handlers cannot be installed,
    /// `SetupError::SegmentAllocation` if the segment cannot be created.
    pub fn prepare(id: WorkerId, config: WorkerConfig) -> Result<PreparedWorker, SetupError> {
        let signals = register_signals()?;
        let segment = SegmentHandle::create_or_attach(id, &config.state_dir)?.initialize();
        let _ = log(&format!(
            "Worker {} attached shared segment with key {} ({})",
            id,
            segment.key(),
            segment.token_path().display()
        ));
        Ok(PreparedWorker {
            id,
            config,
            segment,
            signals,
        })
    }

    /// `prepare` and `launch` in one go, for callers that do not daemonize
    pub fn start(id: WorkerId, config: WorkerConfig) -> Result<Self, SetupError> {
        Worker::boot(id, config, || Ok(()))
    }

    /// Prepares the worker, runs `detach` (daemonizing, in the binary), then
    /// launches the threads
    ///
    /// `detach` only runs once the segment exists, so allocation failures
    /// reach the original caller. If `detach` fails the segment is released.
    pub fn boot<F>(id: WorkerId, config: WorkerConfig, detach: F) -> Result<Self, SetupError>
    where
        F: FnOnce() -> Result<(), SetupError>,
    {
        let prepared = Worker::prepare(id, config)?;
        if let Err(e) = detach() {
            prepared.abort();
            return Err(e);
        }
        prepared.launch()
    }
}

impl<S: RecordStore + 'static> Worker<S> {
    /// Builds a worker around an already initialized store
    ///
    /// Without `signals` no listener runs; the state is then driven through
    /// `state()` and `controller::apply`.
    pub fn with_store(
        id: WorkerId,
        config: WorkerConfig,
        store: S,
        signals: Option<Signals>,
    ) -> Result<Self, SetupError> {
        let state = Arc::new(StateLock::new(store)?);

        let listener = match signals {
            Some(signals) => match SignalListener::spawn(signals, Arc::clone(&state)) {
                Ok(listener) => Some(listener),
                Err(e) => {
                    shutdown(state, None, None);
                    return Err(e);
                }
            },
            None => None,
        };

        let bonus = match BonusTask::spawn(Arc::clone(&state), config.tick) {
            Ok(bonus) => bonus,
            Err(e) => {
                shutdown(state, None, listener);
                return Err(e);
            }
        };

        let status_log = StatusLog::new(id, &config.state_dir);

        Ok(Worker {
            id,
            config,
            state,
            bonus,
            listener,
            status_log,
        })
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Shared handle to the locked state
    ///
    /// Must be dropped before `run` reaches teardown, or the segment cannot
    /// be released.
    pub fn state(&self) -> Arc<StateLock<S>> {
        Arc::clone(&self.state)
    }

    /// Runs the accrual loop until `running` is cleared, then shuts down
    ///
    /// Returns the shutdown failures, already logged.
    pub fn run(self) -> Vec<ShutdownError> {
        let _ = log(&format!(
            "Worker {} started, tick {:?}, status log {}",
            self.id,
            self.config.tick,
            self.status_log.path().display()
        ));

        accrual::run(&self.state, &self.status_log, self.config.tick);

        let record = self.state.snapshot();
        let _ = log(&format!(
            "Worker {} stopping: {}, hours worked {}, salary {:.2}",
            self.id,
            record.status(),
            record.hours_worked(),
            record.salary()
        ));

        let errors = shutdown(self.state, Some(self.bonus), self.listener);
        let _ = log(&format!("Worker {} shut down", self.id));
        errors
    }
}
