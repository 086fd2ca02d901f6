//! Worker status inspector
//!
//! Attaches read-only to a running worker's shared segment and prints its
//! record. The worker's lock is process-local, so the copy is taken without
//! it and may be torn if the worker is mid-update.
//! Usage: cargo run --bin worker-status -- <worker_id>

use payroll_worker::config::WorkerConfig;
use payroll_worker::segment::{token_path, SegmentView};
use payroll_worker::WorkerId;

use std::env;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: {} <worker_id>", args[0]);
        eprintln!();
        eprintln!("Reads worker_<id>.key from $PAYROLL_STATE_DIR (default: current directory)");
        std::process::exit(1);
    }

    let worker_id: WorkerId = match args[1].parse() {
        Ok(id) => id,
        Err(_) => {
            eprintln!("Error: Worker id must be a non-negative integer, got '{}'", args[1]);
            std::process::exit(1);
        }
    };

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let view = match SegmentView::open(worker_id, &config.state_dir) {
        Ok(view) => view,
        Err(e) => {
            eprintln!(
                "Error: no shared segment for worker {} (key file {}): {}",
                worker_id,
                token_path(&config.state_dir, worker_id).display(),
                e
            );
            std::process::exit(1);
        }
    };

    let record = view.snapshot();
    println!("Worker {}", worker_id);
    println!("  Status:         {}", record.status());
    println!("  Hours Worked:   {}", record.hours_worked());
    println!("  Current Salary: {:.2}", record.salary());
    println!("  Category Bonus: {}", record.category_bonus());
}
