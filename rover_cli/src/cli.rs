//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

/// Flush guard of the file log writer; dropped by `flush_logs` before exit.
pub static FILE_GUARD: Mutex<Option<tracing_appender::non_blocking::WorkerGuard>> =
    Mutex::new(None);
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "rover", version, about = "Obstacle-avoiding rover controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/rover.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG wins when set
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Drive and avoid obstacles until Ctrl-C (or the optional deadline)
    Run {
        /// Stop by itself after this many milliseconds
        #[arg(long, value_name = "MS")]
        duration_ms: Option<u64>,
        /// Use simulated backends even when built with hardware support
        #[arg(long, action = ArgAction::SetTrue)]
        sim: bool,
    },
    /// Open every capability, take a few range samples, then disarm
    SelfCheck {
        /// Number of range samples to take
        #[arg(long, default_value_t = 5)]
        samples: u32,
        #[arg(long, action = ArgAction::SetTrue)]
        sim: bool,
    },
    /// Report config validity and backend as JSON
    Health,
}

/// Drop the file writer guard so buffered log lines reach disk.
pub fn flush_logs() {
    if let Ok(mut g) = FILE_GUARD.lock() {
        drop(g.take());
    }
}

impl Cli {
    pub fn json_mode() -> bool {
        JSON_MODE.get().copied().unwrap_or(false)
    }
}
