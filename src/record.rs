//! Worker state record stored in the shared segment
//!
//! The layout is `#[repr(C)]` `int, int, float, int` (16 bytes) so any
//! process attaching to the same segment, C readers included, sees the same
//! fields. Status is kept as a raw `i32` for the same reason. Salary is an
//! `f32` in memory; every increment is a whole number, which `f32` holds
//! exactly far past the cap.

use std::fmt;

/// Salary added per working tick by the accrual loop
pub const HOURLY_RATE: f64 = 10.0;

/// Bonus paid per tick, multiplied by the category bonus
pub const BONUS_BASE: f64 = 5.0;

/// Bonus applies once hours worked exceed this value
pub const BONUS_THRESHOLD_HOURS: u32 = 8;

/// Accrual stops for good once salary reaches this amount
pub const SALARY_CAP: f64 = 1000.0;

/// Category bonus written at initialization
pub const INITIAL_CATEGORY_BONUS: i32 = 1;

/// Operational status of a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    Working,
    OnBreak,
    /// Terminal
    Stopped,
}

impl WorkerStatus {
    /// Raw value stored in the shared record
    pub fn as_raw(self) -> i32 {
        match self {
            WorkerStatus::Working => 1,
            WorkerStatus::OnBreak => 0,
            WorkerStatus::Stopped => -1,
        }
    }

    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            1 => Some(WorkerStatus::Working),
            0 => Some(WorkerStatus::OnBreak),
            -1 => Some(WorkerStatus::Stopped),
            _ => None,
        }
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerStatus::Working => "working",
            WorkerStatus::OnBreak => "on break",
            WorkerStatus::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Live state of one worker
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkerRecord {
    status: i32,
    hours_worked: u32,
    salary: f32,
    category_bonus: i32,
}

impl WorkerRecord {
    /// Startup values: working, no hours, no salary, category bonus 1
    pub fn initial() -> Self {
        WorkerRecord {
            status: WorkerStatus::Working.as_raw(),
            hours_worked: 0,
            salary: 0.0,
            category_bonus: INITIAL_CATEGORY_BONUS,
        }
    }

    /// Current status
    ///
    /// An unknown raw value (only possible if another process scribbled over
    /// the segment) reads as `Stopped`, so no accrual happens on garbage.
    pub fn status(&self) -> WorkerStatus {
        WorkerStatus::from_raw(self.status).unwrap_or(WorkerStatus::Stopped)
    }

    pub fn hours_worked(&self) -> u32 {
        self.hours_worked
    }

    pub fn salary(&self) -> f64 {
        f64::from(self.salary)
    }

    fn add_salary(&mut self, amount: f64) {
        self.salary = (f64::from(self.salary) + amount) as f32;
    }

    pub fn category_bonus(&self) -> i32 {
        self.category_bonus
    }

    pub fn is_working(&self) -> bool {
        self.status() == WorkerStatus::Working
    }

    /// Assigns a new status unless the record is already stopped
    ///
    /// Returns the status in effect afterwards.
    pub fn set_status(&mut self, status: WorkerStatus) -> WorkerStatus {
        if self.status() != WorkerStatus::Stopped {
            self.status = status.as_raw();
        }
        self.status()
    }

    /// One accrual step: an hour and `HOURLY_RATE` of salary while working
    ///
    /// Returns true if the record changed.
    pub fn accrue(&mut self) -> bool {
        if !self.is_working() {
            return false;
        }
        self.hours_worked = self.hours_worked.saturating_add(1);
        self.add_salary(HOURLY_RATE);
        true
    }

    /// One bonus step: `BONUS_BASE * category_bonus` while working overtime
    ///
    /// Returns true if the bonus was paid.
    pub fn apply_bonus(&mut self) -> bool {
        if !self.is_working() || self.hours_worked <= BONUS_THRESHOLD_HOURS {
            return false;
        }
        self.add_salary(BONUS_BASE * f64::from(self.category_bonus));
        true
    }

    pub fn cap_reached(&self) -> bool {
        self.salary() >= SALARY_CAP
    }
}

impl Default for WorkerRecord {
    fn default() -> Self {
        WorkerRecord::initial()
    }
}
