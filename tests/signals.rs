//! Drives a worker through real signals delivered to this test process.
//!
//! The signals hit the whole process, so the tests here run one at a time.

use nix::sys::signal::{raise, Signal};
use payroll_worker::controller::register_signals;
use payroll_worker::{HeapRecord, StateLock, Worker, WorkerConfig, WorkerStatus};
use serial_test::serial;
use std::thread;
use std::time::{Duration, Instant};

fn wait_for(state: &StateLock<HeapRecord>, what: &str, check: impl Fn(&StateLock<HeapRecord>) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !check(state) {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
#[serial]
fn test_break_resume_terminate_signals() {
    let dir = tempfile::tempdir().unwrap();
    let config = WorkerConfig {
        tick: Duration::from_millis(20),
        state_dir: dir.path().to_path_buf(),
        foreground: true,
    };
    let worker = Worker::with_store(5, config, HeapRecord::new(), Some(register_signals().unwrap())).unwrap();
    let state = worker.state();
    let runner = thread::spawn(move || worker.run());

    wait_for(&state, "first hour", |s| s.snapshot().hours_worked() >= 1);

    raise(Signal::SIGUSR1).unwrap();
    wait_for(&state, "break", |s| s.snapshot().status() == WorkerStatus::OnBreak);
    let on_break = state.snapshot();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(state.snapshot(), on_break, "record changed while on break");

    raise(Signal::SIGUSR2).unwrap();
    wait_for(&state, "resume", |s| s.snapshot().status() == WorkerStatus::Working);
    wait_for(&state, "accrual after resume", |s| {
        s.snapshot().hours_worked() > on_break.hours_worked()
    });

    raise(Signal::SIGTERM).unwrap();
    wait_for(&state, "terminate", |s| !s.is_running());
    let stopped = state.snapshot();
    assert_eq!(stopped.status(), WorkerStatus::Stopped);
    assert!(stopped.salary() < 1000.0);
    drop(state);

    let errors = runner.join().unwrap();
    assert!(errors.is_empty(), "unexpected shutdown errors: {:?}", errors);
}

#[test]
#[serial]
fn test_signal_before_listener_starts_is_queued() {
    let dir = tempfile::tempdir().unwrap();
    let config = WorkerConfig {
        tick: Duration::from_millis(20),
        state_dir: dir.path().to_path_buf(),
        foreground: true,
    };

    // Handlers are in place before any thread runs; SIGTERM must not kill us
    let signals = register_signals().unwrap();
    raise(Signal::SIGTERM).unwrap();

    let worker = Worker::with_store(6, config, HeapRecord::new(), Some(signals)).unwrap();
    let state = worker.state();
    wait_for(&state, "queued terminate", |s| !s.is_running());
    assert_eq!(state.snapshot().status(), WorkerStatus::Stopped);
    drop(state);

    let errors = worker.run();
    assert!(errors.is_empty(), "unexpected shutdown errors: {:?}", errors);
}
