//! Mirage CLI
//!
//! Serves mock responses for an API description document.
//!
//! Usage:
//!   mirage <definition> [OPTIONS]

use anyhow::Context;
use clap::Parser;
use mirage_server::config::{parse_statuses, ServerConfig};
use mirage_server::{launch, HookMap};
use std::path::PathBuf;
use tracing::info;

/// Mirage - mock HTTP server for API descriptions
#[derive(Parser, Debug)]
#[command(name = "mirage")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// API description (JSON or YAML) with `resources` and `definitions`
    definition: Option<PathBuf>,

    /// Configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Host to bind
    #[arg(long)]
    host: Option<String>,

    /// Comma separated status allowlist, e.g. `200,404`
    #[arg(short, long)]
    statuses: Option<String>,

    /// Serve literal examples instead of generated values
    #[arg(short = 'e', long)]
    force_example: bool,

    /// File mapping custom string formats to sample values
    #[arg(short, long)]
    formats: Option<PathBuf>,

    /// Base directory for file `$ref`s
    #[arg(short, long)]
    directory: Option<PathBuf>,

    /// Suppress the activity log
    #[arg(long)]
    silent: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<ServerConfig> {
        let mut config = match self.config {
            Some(ref path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default(),
        };

        if let Some(definition) = self.definition {
            config.definition = Some(definition);
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(ref statuses) = self.statuses {
            config.statuses = Some(parse_statuses(statuses));
        }
        if self.force_example {
            config.force_example = true;
        }
        if let Some(formats) = self.formats {
            config.formats = Some(formats);
        }
        if let Some(directory) = self.directory {
            config.directory = Some(directory);
        }
        if self.silent {
            config.silent = true;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config()?;
    let handle = launch(&config, HookMap::new())
        .await
        .context("Failed to start mock server")?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutting down");
    handle.close().await;
    Ok(())
}
