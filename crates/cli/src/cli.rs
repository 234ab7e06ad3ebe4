//! Command line arguments.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Fetch feed sources and regenerate transformed outputs.
#[derive(Debug, Parser)]
#[command(name = "feedtr", version, about)]
pub struct Cli {
    /// Feed config file (JSON, or TOML with a `.toml` extension).
    ///
    /// The config is read as JSON from standard input when omitted. Relative
    /// directories in the file are resolved against the file's directory.
    #[arg(long, env = "FEEDTR_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Log line format written to stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Pretty,
}
