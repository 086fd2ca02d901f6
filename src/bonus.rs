//! Background bonus task
//!
//! Ticks at the same interval as the accrual loop and pays
//! `BONUS_BASE * category_bonus` on every tick where the worker is working
//! and has more than `BONUS_THRESHOLD_HOURS` hours.

use crate::error::{SetupError, ShutdownError};
use crate::segment::RecordStore;
use crate::state::StateLock;

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Bonus step; returns `running` as seen in the same critical section
pub fn bonus_tick<S: RecordStore>(state: &StateLock<S>) -> bool {
    state.with(|guarded| {
        if guarded.is_running() {
            guarded.record_mut().apply_bonus();
        }
        guarded.is_running()
    })
}

/// Handle of the running bonus thread
pub struct BonusTask {
    thread: JoinHandle<()>,
}

impl BonusTask {
    /// Starts the bonus thread
    ///
    /// # Errors
    /// `SetupError::TaskSpawn` if the thread cannot be created.
    pub fn spawn<S>(state: Arc<StateLock<S>>, tick: Duration) -> Result<Self, SetupError>
    where
        S: RecordStore + 'static,
    {
        let thread = thread::Builder::new()
            .name("bonus".to_string())
            .spawn(move || {
                while bonus_tick(&state) {
                    thread::sleep(tick);
                }
            })
            .map_err(|source| SetupError::TaskSpawn {
                task: "bonus",
                source,
            })?;
        Ok(BonusTask { thread })
    }

    /// Waits for the thread to observe `running == false` and exit
    pub fn join(self) -> Result<(), ShutdownError> {
        self.thread
            .join()
            .map_err(|_| ShutdownError::TaskJoin("bonus"))
    }
}
