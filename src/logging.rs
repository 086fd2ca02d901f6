use crate::error::LoggingError;
use crate::record::WorkerRecord;
use crate::WorkerId;

use chrono::Local;
use once_cell::sync::Lazy;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Global diagnostic log file path protected by Mutex
///
/// When None, diagnostics go to stderr.
pub static LOG_FILE: Lazy<Mutex<Option<PathBuf>>> = Lazy::new(|| Mutex::new(None));

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Appends one line to `path`, creating the file if needed
fn append_line(path: &Path, line: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())
}

/// Logs a diagnostic message with timestamp
///
/// Goes to the file set with `set_log_file`, or to stderr.
///
/// # Returns
/// * `io::Result<()>` - Ok on success, Err if writing fails
pub fn log(message: &str) -> io::Result<()> {
    let line = format!("{} {}\n", timestamp(), message);

    match &*LOG_FILE.lock().unwrap_or_else(PoisonError::into_inner) {
        Some(path) => append_line(path, &line)?,
        None => eprint!("{}", line),
    }

    Ok(())
}

/// Sets the path for the diagnostic log file
pub fn set_log_file<P: AsRef<Path>>(path: P) {
    *LOG_FILE.lock().unwrap_or_else(PoisonError::into_inner) = Some(path.as_ref().to_path_buf());
}

/// Path of the status log for `worker_id` inside `dir`
pub fn status_log_path(dir: &Path, worker_id: WorkerId) -> PathBuf {
    dir.join(format!("worker_{}.log", worker_id))
}

/// Append-only per-worker status log
///
/// One line per working tick with hours worked and current salary.
#[derive(Debug, Clone)]
pub struct StatusLog {
    worker_id: WorkerId,
    path: PathBuf,
}

impl StatusLog {
    pub fn new(worker_id: WorkerId, dir: &Path) -> Self {
        StatusLog {
            worker_id,
            path: status_log_path(dir, worker_id),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Formats the status line for `record`, without timestamp
    pub fn format_line(&self, record: &WorkerRecord) -> String {
        format!(
            "[Worker {}] Hours Worked: {}, Current Salary: {:.2}",
            self.worker_id,
            record.hours_worked(),
            record.salary()
        )
    }

    /// Appends the status line for `record`
    ///
    /// The file is opened per call, so a vanished or rotated file is
    /// recreated on the next tick.
    pub fn write(&self, record: &WorkerRecord) -> Result<(), LoggingError> {
        let line = format!("{} {}\n", timestamp(), self.format_line(record));
        append_line(&self.path, &line).map_err(|source| LoggingError {
            path: self.path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    #[serial]
    fn test_log_to_file() {
        *LOG_FILE.lock().unwrap() = None;

        let dir = tempdir().unwrap();
        let log_file_path = dir.path().join("diag.log");

        set_log_file(&log_file_path);
        log("test message 1").unwrap();
        log("test message 2").unwrap();

        let log_contents = fs::read_to_string(&log_file_path).unwrap();
        assert!(log_contents.contains("test message 1"));
        assert!(log_contents.contains("test message 2"));

        *LOG_FILE.lock().unwrap() = None;
    }

    #[test]
    #[serial]
    fn test_log_to_stderr() {
        *LOG_FILE.lock().unwrap() = None;
        log("test stderr message").unwrap();
    }

    #[test]
    #[serial]
    fn test_log_to_missing_directory_fails() {
        set_log_file("/nonexistent-dir/diag.log");
        assert!(log("lost").is_err());
        *LOG_FILE.lock().unwrap() = None;
    }

    #[test]
    fn test_status_line_format() {
        let dir = tempdir().unwrap();
        let status_log = StatusLog::new(4, dir.path());
        let mut record = WorkerRecord::initial();
        for _ in 0..9 {
            record.accrue();
        }
        record.apply_bonus();

        assert_eq!(
            status_log.format_line(&record),
            "[Worker 4] Hours Worked: 9, Current Salary: 95.00"
        );
    }

    #[test]
    fn test_status_log_appends() {
        let dir = tempdir().unwrap();
        let status_log = StatusLog::new(2, dir.path());
        assert_eq!(status_log.path(), dir.path().join("worker_2.log"));

        let mut record = WorkerRecord::initial();
        record.accrue();
        status_log.write(&record).unwrap();
        record.accrue();
        status_log.write(&record).unwrap();

        let contents = fs::read_to_string(status_log.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[Worker 2] Hours Worked: 1, Current Salary: 10.00"));
        assert!(lines[1].ends_with("[Worker 2] Hours Worked: 2, Current Salary: 20.00"));
    }

    #[test]
    fn test_status_log_failure_is_reported() {
        let status_log = StatusLog::new(5, Path::new("/nonexistent-dir"));
        let err = status_log.write(&WorkerRecord::initial()).unwrap_err();
        assert!(err.path.ends_with("worker_5.log"));
    }
}
