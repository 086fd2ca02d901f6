use crate::error::SetupError;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Tick interval in milliseconds
pub const ENV_TICK_MS: &str = "PAYROLL_TICK_MS";
/// Directory for key token, status log and diagnostic log
pub const ENV_STATE_DIR: &str = "PAYROLL_STATE_DIR";
/// `1`/`true` keeps the worker attached to the terminal
pub const ENV_FOREGROUND: &str = "PAYROLL_FOREGROUND";

/// Default interval between ticks of the accrual loop and the bonus task
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Runtime settings of a worker process
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    /// Interval between ticks
    pub tick: Duration,
    /// Where `worker_<id>.key`, `worker_<id>.log` and the diagnostic log live
    pub state_dir: PathBuf,
    /// Skip daemonizing
    pub foreground: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            tick: DEFAULT_TICK,
            state_dir: PathBuf::from("."),
            foreground: false,
        }
    }
}

impl WorkerConfig {
    /// Builds the configuration from defaults and environment overrides
    ///
    /// # Errors
    /// `SetupError::Config` naming the variable if a value cannot be parsed.
    pub fn from_env() -> Result<Self, SetupError> {
        let mut config = WorkerConfig::default();

        if let Ok(value) = env::var(ENV_TICK_MS) {
            config.tick = match value.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => {
                    return Err(SetupError::Config(format!(
                        "{} must be a positive number of milliseconds, got '{}'",
                        ENV_TICK_MS, value
                    )))
                }
            };
        }

        if let Some(dir) = env::var_os(ENV_STATE_DIR) {
            if dir.is_empty() {
                return Err(SetupError::Config(format!("{} must not be empty", ENV_STATE_DIR)));
            }
            config.state_dir = PathBuf::from(dir);
        }

        if let Ok(value) = env::var(ENV_FOREGROUND) {
            config.foreground = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                _ => {
                    return Err(SetupError::Config(format!(
                        "{} must be 1/true or 0/false, got '{}'",
                        ENV_FOREGROUND, value
                    )))
                }
            };
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_defaults() {
        temp_env::with_vars_unset([ENV_TICK_MS, ENV_STATE_DIR, ENV_FOREGROUND], || {
            let config = WorkerConfig::from_env().unwrap();
            assert_eq!(config, WorkerConfig::default());
            assert_eq!(config.tick, Duration::from_secs(1));
            assert_eq!(config.state_dir, PathBuf::from("."));
            assert!(!config.foreground);
        });
    }

    #[test]
    #[serial]
    fn test_overrides() {
        temp_env::with_vars(
            [
                (ENV_TICK_MS, Some("25")),
                (ENV_STATE_DIR, Some("/var/lib/payroll")),
                (ENV_FOREGROUND, Some("true")),
            ],
            || {
                let config = WorkerConfig::from_env().unwrap();
                assert_eq!(config.tick, Duration::from_millis(25));
                assert_eq!(config.state_dir, PathBuf::from("/var/lib/payroll"));
                assert!(config.foreground);
            },
        );
    }

    #[test]
    #[serial]
    fn test_invalid_tick() {
        for bad in ["0", "-5", "fast"] {
            temp_env::with_var(ENV_TICK_MS, Some(bad), || {
                match WorkerConfig::from_env() {
                    Err(SetupError::Config(msg)) => assert!(msg.contains(ENV_TICK_MS)),
                    other => panic!("expected config error, got {:?}", other),
                }
            });
        }
    }

    #[test]
    #[serial]
    fn test_invalid_foreground() {
        temp_env::with_var(ENV_FOREGROUND, Some("maybe"), || {
            assert!(WorkerConfig::from_env().is_err());
        });
    }

    #[test]
    #[serial]
    fn test_empty_state_dir() {
        temp_env::with_var(ENV_STATE_DIR, Some(""), || {
            assert!(WorkerConfig::from_env().is_err());
        });
    }
}
