//! Orderly teardown once `running` has been cleared
//!
//! Order matters: every thread holding the state is joined before the lock
//! is torn down, and the lock is torn down before the segment is released,
//! so nothing can write to the region after it is gone. Each step is best
//! effort: a failure is logged and the remaining steps still run.

use crate::bonus::BonusTask;
use crate::controller::SignalListener;
use crate::error::ShutdownError;
use crate::logging::log;
use crate::segment::RecordStore;
use crate::state::StateLock;

use std::sync::Arc;

/// Runs the shutdown sequence and returns every failure seen
///
/// `bonus` and `listener` are `None` when setup failed before they started.
/// The worker is stopped first, so calling this on a running worker is safe.
pub fn shutdown<S: RecordStore>(
    state: Arc<StateLock<S>>,
    bonus: Option<BonusTask>,
    listener: Option<SignalListener>,
) -> Vec<ShutdownError> {
    let mut errors = Vec::new();

    state.with(|guarded| {
        if guarded.is_running() {
            guarded.stop();
        }
    });

    if let Some(bonus) = bonus {
        if let Err(e) = bonus.join() {
            errors.push(e);
        }
    }

    if let Some(listener) = listener {
        if let Err(e) = listener.stop() {
            errors.push(e);
        }
    }

    match Arc::try_unwrap(state) {
        Ok(lock) => {
            let store = lock.into_store();
            if let Err(e) = store.release() {
                errors.push(e);
            }
        }
        Err(shared) => {
            // Someone still holds the lock; the segment stays attached until they drop it
            errors.push(ShutdownError::LockBusy(Arc::strong_count(&shared) - 1));
        }
    }

    for e in &errors {
        let _ = log(&format!("Shutdown: {}", e));
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::WorkerStatus;
    use crate::segment::{HeapRecord, SegmentHandle, SegmentView};
    use serial_test::serial;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_shutdown_stops_and_joins() {
        let state = Arc::new(StateLock::new(HeapRecord::new()).unwrap());
        let bonus = BonusTask::spawn(Arc::clone(&state), Duration::from_millis(1)).unwrap();

        let errors = shutdown(state, Some(bonus), None);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_shutdown_reports_busy_lock() {
        let state = Arc::new(StateLock::new(HeapRecord::new()).unwrap());
        let extra = Arc::clone(&state);

        let errors = shutdown(state, None, None);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ShutdownError::LockBusy(1)));

        // The straggler sees a stopped worker
        assert!(!extra.is_running());
        assert_eq!(extra.snapshot().status(), WorkerStatus::Stopped);
    }

    #[test]
    #[serial]
    fn test_shutdown_releases_segment() {
        let dir = tempdir().unwrap();
        let segment = SegmentHandle::create_or_attach(21, dir.path())
            .unwrap()
            .initialize();
        let state = Arc::new(StateLock::new(segment).unwrap());
        let bonus = BonusTask::spawn(Arc::clone(&state), Duration::from_millis(1)).unwrap();

        let errors = shutdown(state, Some(bonus), None);
        assert!(errors.is_empty());
        assert!(SegmentView::open(21, dir.path()).is_err());
    }
}
