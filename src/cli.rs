//! Command-line interface for portastack.
use std::path::PathBuf;

use clap::Parser;

/// Command-line interface for portastack.
#[derive(Parser)]
#[command(name = "portastack", version, author)]
#[command(about = "A portable web stack supervisor", long_about = None)]
pub struct Cli {
    /// Path to the configuration file (defaults to `portastack.yaml` when present).
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override the stack root directory from the configuration.
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Override the logging verbosity for this invocation only.
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

/// Parses command-line arguments and returns a `Cli` struct.
pub fn parse_args() -> Cli {
    Cli::parse()
}
