//! Docuform command-line entry point.

use anyhow::Context;
use clap::Parser;
use docuform_cli::{Cli, Command};
use docuform_core::{ConfigManager, DocuformConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "info,docuform=debug",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // `config` subcommands must work even when the file is broken.
    let config = match &cli.command {
        Command::Config { .. } => DocuformConfig::default(),
        _ => DocuformConfig::load(cli.config.as_deref()).context("loading configuration")?,
    };

    docuform_cli::commands::run(config, cli.config.as_deref(), cli.command).await?;
    Ok(())
}
