//! feedtr entry point.
//!
//! Reads the feed config, refreshes the source cache, then regenerates the
//! outputs whose source changed. Logging goes to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use feedtr_core::AppConfig;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

use cli::{Cli, LogFormat};

mod cli;
mod pipeline;

async fn load_config(cli: &Cli) -> Result<AppConfig> {
    match &cli.config_file {
        Some(path) => {
            tracing::debug!("Loading config from {}", path.display());
            Ok(AppConfig::load_file(path)?)
        }
        None => {
            tracing::debug!("Loading config from stdin");
            let mut json = String::new();
            tokio::io::stdin()
                .read_to_string(&mut json)
                .await
                .context("reading config from stdin")?;
            Ok(AppConfig::load_json(&json)?)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    match cli.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.pretty().init(),
    }

    let config = load_config(&cli).await?;
    tracing::info!(outputs = config.outputs.len(), "Starting feedtr");

    pipeline::run(&config).await
}
