use crate::WorkerId;

use std::env;
use std::process;

/// What the command line asked for
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Run(WorkerId),
    Help,
    Version,
}

/// Usage line, using `PROGRAM_NAME` from `crate` for the executable name
pub fn usage() -> String {
    format!("Usage: {} [-h] [-v] <worker_id>", crate::PROGRAM_NAME)
}

/// Parses the arguments that follow the program name
///
/// # Errors
/// A message for stderr if the worker id is missing, repeated, or not a
/// non-negative integer.
pub fn parse_from<I>(args: I) -> Result<Command, String>
where
    I: IntoIterator<Item = String>,
{
    let mut worker_id = None;

    for arg in args {
        match arg.as_str() {
            "-h" => return Ok(Command::Help),
            "-v" => return Ok(Command::Version),
            _ if worker_id.is_some() => {
                return Err(format!("Unexpected argument: {}", arg));
            }
            _ => {
                worker_id = Some(arg.parse::<WorkerId>().map_err(|_| {
                    format!("Error: Worker id must be a non-negative integer, got '{}'", arg)
                })?);
            }
        }
    }

    worker_id
        .map(Command::Run)
        .ok_or_else(|| "Missing worker id argument".to_string())
}

/// Parses command line arguments and returns the worker id
///
/// Prints usage and exits 0 for `-h`, prints the version and exits 0 for
/// `-v`, prints the error and usage to stderr and exits 1 otherwise.
pub fn parse_args() -> WorkerId {
    match parse_from(env::args().skip(1)) {
        Ok(Command::Run(worker_id)) => worker_id,
        Ok(Command::Help) => {
            println!("{}", usage());
            process::exit(0);
        }
        Ok(Command::Version) => {
            println!("{} version {}", crate::PROGRAM_NAME, crate::PROGRAM_VERSION);
            process::exit(0);
        }
        Err(msg) => {
            eprintln!("{}", msg);
            eprintln!("{}", usage());
            process::exit(1);
        }
    }
}
