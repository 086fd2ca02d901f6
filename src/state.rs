//! The single lock guarding a worker's record and its `running` flag
//!
//! Every read and write of the record goes through `StateLock::with`, which
//! hands the closure a `&mut Guarded` for the duration of one critical
//! section. The closure cannot reach the lock again, so a task can never try
//! to take it while already holding it.

use crate::error::SetupError;
use crate::record::{WorkerRecord, WorkerStatus};
use crate::segment::RecordStore;

use std::sync::{Mutex, PoisonError};

/// State visible only while the lock is held
pub struct Guarded<S> {
    store: S,
    running: bool,
}

impl<S: RecordStore> Guarded<S> {
    pub fn record(&self) -> &WorkerRecord {
        self.store.record()
    }

    pub fn record_mut(&mut self) -> &mut WorkerRecord {
        self.store.record_mut()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Marks the record stopped and clears `running`, together
    pub fn stop(&mut self) {
        self.store.record_mut().set_status(WorkerStatus::Stopped);
        self.running = false;
    }
}

/// Mutual exclusion over the whole worker state
pub struct StateLock<S> {
    inner: Mutex<Guarded<S>>,
}

impl<S: RecordStore> StateLock<S> {
    /// Wraps an initialized store; the worker starts out running
    ///
    /// # Errors
    /// `SetupError::LockInit` if the store already holds a stopped record,
    /// since nothing could ever run against it.
    pub fn new(store: S) -> Result<Self, SetupError> {
        if store.record().status() == WorkerStatus::Stopped {
            return Err(SetupError::LockInit(
                "record is stopped before the worker started".to_string(),
            ));
        }
        Ok(StateLock {
            inner: Mutex::new(Guarded {
                store,
                running: true,
            }),
        })
    }

    /// Runs `f` with the lock held
    ///
    /// A poisoned lock is recovered: every critical section in this crate
    /// leaves the record consistent even if the holder later panicked.
    pub fn with<R>(&self, f: impl FnOnce(&mut Guarded<S>) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *guard)
    }

    /// Copy of the record taken under the lock
    pub fn snapshot(&self) -> WorkerRecord {
        self.with(|state| *state.record())
    }

    pub fn is_running(&self) -> bool {
        self.with(|state| state.is_running())
    }

    /// Tears the lock down and hands back the store
    pub fn into_store(self) -> S {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .store
    }
}
