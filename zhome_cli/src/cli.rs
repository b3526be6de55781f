//! CLI argument definitions and shared statics.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();
/// Effective retry settings of the current run (for JSON error details).
pub static LAST_RUN: OnceLock<CliRun> = OnceLock::new();

#[derive(Copy, Clone, Debug)]
pub struct CliRun {
    pub max_retries: u32,
    pub retry_tolerance: f64,
    pub window: usize,
}

#[derive(Parser, Debug)]
#[command(name = "zhome", version, about = "Stable Z homing CLI")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/zhome.toml")]
    pub config: PathBuf,

    /// Print the run summary and errors as JSON instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Per-invocation replacements for the `[stable_z_home]` defaults.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct OverrideArgs {
    /// Maximum homing attempts
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,
    /// Accepted drift-compensated window spread in mm (>= 0.001)
    #[arg(long = "retry-tolerance", value_name = "MM")]
    pub retry_tolerance: Option<f64>,
    /// Number of recent positions the convergence test looks at (>= 3)
    #[arg(long, value_name = "N")]
    pub window: Option<usize>,
}

impl From<OverrideArgs> for zhome_core::Overrides {
    fn from(a: OverrideArgs) -> Self {
        Self {
            retries: a.retries,
            retry_tolerance: a.retry_tolerance,
            window: a.window,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Home Z repeatedly until the endstop position is stable
    Home {
        #[command(flatten)]
        overrides: OverrideArgs,
        /// Print total runtime on completion
        #[arg(long, action = ArgAction::SetTrue)]
        print_runtime: bool,
    },
    /// Run the convergence test over a recorded session
    Replay {
        /// Recorded session CSV (headers: position,calibration_input)
        #[arg(long, value_name = "FILE")]
        samples: PathBuf,
        /// Estimate the drift constants from the recording instead of replaying it
        #[arg(long = "fit-drift", action = ArgAction::SetTrue)]
        fit_drift: bool,
        #[command(flatten)]
        overrides: OverrideArgs,
    },
    /// Validate the config and host preconditions without homing
    SelfCheck,
}
