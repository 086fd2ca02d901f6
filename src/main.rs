use payroll_worker::{daemon, log, parse_args, set_log_file, Worker, WorkerConfig};

use std::process;

fn main() {
    let worker_id = parse_args();

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let foreground = config.foreground;
    let diag_log = config.state_dir.join(format!("worker_{}.diag.log", worker_id));

    // Segment setup runs before the fork, so its failures still exit 1 here
    let worker = Worker::boot(worker_id, config, || {
        if foreground {
            return Ok(());
        }
        // stderr is gone after this point
        set_log_file(&diag_log);
        daemon::daemonize()
    });

    let worker = match worker {
        Ok(worker) => worker,
        Err(e) => {
            let _ = log(&format!("Error: worker {} failed to start: {}", worker_id, e));
            process::exit(1);
        }
    };

    // Shutdown failures are logged inside run() and do not change the exit code
    worker.run();
}
