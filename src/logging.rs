//! Logging setup for picdupe.
//!
//! Uses the `log` facade with an `env_logger` backend. The level comes from,
//! in priority order:
//!
//! 1. `RUST_LOG`, if set
//! 2. `--quiet` (errors only) or `--verbose` (`-v` debug, `-vv` trace)
//! 3. info
//!
//! Debug builds and verbose runs print a timestamp and module path; release
//! builds otherwise print only level and message.
//!
//! ```rust,no_run
//! use picdupe::logging::init_logging;
//!
//! init_logging(1, false);
//! log::debug!("visible with -v");
//! ```

use std::env;
use std::io::Write;

use env_logger::Builder;
use log::LevelFilter;

/// Line layout for log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    /// `<timestamp> <LEVEL> [module] message`
    Detailed,
    /// `<LEVEL> message`
    Compact,
}

/// Initialize the logger from CLI verbosity flags.
///
/// Returns `false` if a logger was already installed (for instance by an
/// earlier call in the same process); the existing logger stays in place.
pub fn init_logging(verbose: u8, quiet: bool) -> bool {
    let from_env = env::var("RUST_LOG").is_ok();
    let level = determine_level(verbose, quiet);

    let mut builder = Builder::new();
    if from_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(level);
    }

    match choose_format(verbose) {
        LogFormat::Detailed => builder.format(|buf, record| {
            let style = buf.default_level_style(record.level());
            writeln!(
                buf,
                "{} {style}{:<5}{style:#} [{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        }),
        LogFormat::Compact => builder.format(|buf, record| {
            let style = buf.default_level_style(record.level());
            writeln!(buf, "{style}{:<5}{style:#} {}", record.level(), record.args())
        }),
    };

    if builder.try_init().is_err() {
        return false;
    }

    if from_env {
        log::debug!("Logging configured from RUST_LOG");
    } else {
        log::debug!("Logging initialized at level {}", level);
    }
    true
}

/// Map CLI flags to a level filter. `quiet` wins over `verbose`.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn choose_format(verbose: u8) -> LogFormat {
    if cfg!(debug_assertions) || verbose > 0 {
        LogFormat::Detailed
    } else {
        LogFormat::Compact
    }
}
