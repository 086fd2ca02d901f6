//! Main accrual loop
//!
//! Each tick: accrue under the lock, write the status line, sleep, then take
//! the lock a second time to enforce the salary cap. The two critical
//! sections are separate, so the bonus task may run in between.

use crate::logging::{log, StatusLog};
use crate::record::WorkerRecord;
use crate::segment::RecordStore;
use crate::state::StateLock;

use std::thread;
use std::time::Duration;

/// Accrual step; returns a copy of the updated record if the worker accrued
pub fn accrue_tick<S: RecordStore>(state: &StateLock<S>) -> Option<WorkerRecord> {
    state.with(|guarded| {
        if guarded.record_mut().accrue() {
            Some(*guarded.record())
        } else {
            None
        }
    })
}

/// Cap step; stops the worker once salary reached the cap
///
/// Returns true if the worker is still running afterwards.
pub fn enforce_cap<S: RecordStore>(state: &StateLock<S>) -> bool {
    state.with(|guarded| {
        if guarded.record().cap_reached() {
            guarded.stop();
        }
        guarded.is_running()
    })
}

/// Runs the loop until `running` is cleared
///
/// Status log failures are reported to the diagnostic log and the loop
/// carries on.
pub fn run<S: RecordStore>(state: &StateLock<S>, status_log: &StatusLog, tick: Duration) {
    while state.is_running() {
        if let Some(record) = accrue_tick(state) {
            if let Err(e) = status_log.write(&record) {
                let _ = log(&format!("Error: {}", e));
            }
        }

        thread::sleep(tick);

        if !enforce_cap(state) {
            break;
        }
    }
}
