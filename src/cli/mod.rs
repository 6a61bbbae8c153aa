//! CLI module
//!
//! Argument parsing and subcommand dispatch for `junos-engine`.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Configuration transactions for Junos devices
#[derive(Parser, Debug, Clone)]
#[command(name = "junos-engine")]
#[command(version)]
#[command(about = "Lock, stage, commit and read back Junos configuration", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Device to connect to (overrides the config file)
    #[arg(short = 'H', long, global = true, env = "JUNOS_HOST")]
    pub host: Option<String>,

    /// Login user (overrides the config file)
    #[arg(short = 'u', long, global = true)]
    pub user: Option<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true, env = "JUNOS_ENGINE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output for scripting
    Json,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Show device identity and feature support
    Facts(commands::facts::FactsArgs),

    /// Run a read-only command
    Show(commands::show::ShowArgs),

    /// Lock, stage, commit and release
    Apply(commands::apply::ApplyArgs),

    /// Parse display-set output into JSON
    Parse(commands::parse::ParseArgs),
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }

    /// Check if JSON output is requested
    pub fn is_json(&self) -> bool {
        matches!(self.output, OutputFormat::Json)
    }
}
