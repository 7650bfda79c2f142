//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Pattern Tracker - Real-time visual pattern detection and tracking pipeline
#[derive(Parser, Debug)]
#[command(
    name = "pattern-tracker",
    author,
    version,
    about = "Real-time visual pattern tracking pipeline",
    long_about = "A real-time detection-then-tracking pipeline for coded visual patterns.\n\n\
                  Consumes a camera frame feed, searches frames for a coded pattern \n\
                  (QR code or data matrix), tracks the model pose at a fixed loop rate, \n\
                  and publishes pose, status and diagnostics over broadcast channels."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "PATTERN_TRACKER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "PATTERN_TRACKER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the tracking pipeline
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "PATTERN_TRACKER_CONFIG"
    )]
    pub config: PathBuf,

    /// Override loop frequency (Hz) from configuration
    #[arg(long, env = "PATTERN_TRACKER_FREQUENCY")]
    pub frequency: Option<f64>,

    /// Override the pattern payload embedded in the synthetic feed
    #[arg(long, env = "PATTERN_TRACKER_MESSAGE")]
    pub message: Option<String>,

    /// Maximum number of loop iterations to run (0 = unlimited)
    #[arg(long, default_value = "0", env = "PATTERN_TRACKER_MAX_ITERATIONS")]
    pub max_iterations: u64,

    /// Pipeline timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "PATTERN_TRACKER_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "PATTERN_TRACKER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show detailed channel configuration
    #[arg(long)]
    pub channels: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
