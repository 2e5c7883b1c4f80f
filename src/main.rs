// src/main.rs

//! The main entry point for the Anchorage game server.

use anchorage::config::Config;
use anchorage::server;
use anyhow::{Result, anyhow, bail};
use std::env;
use tracing::error;
use tracing_subscriber::{filter::EnvFilter, prelude::*};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// What the command line asked for.
#[derive(Debug, Default)]
struct CliArgs {
    show_version: bool,
    config_path: Option<String>,
    port: Option<u16>,
}

impl CliArgs {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut parsed = CliArgs::default();
        let mut args = args.into_iter().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--version" => parsed.show_version = true,
                "--config" => {
                    let path = args.next().ok_or_else(|| anyhow!("--config flag requires a path"))?;
                    parsed.config_path = Some(path);
                }
                "--port" => {
                    let value = args.next().ok_or_else(|| anyhow!("--port flag requires a value"))?;
                    let port = value
                        .parse::<u16>()
                        .map_err(|_| anyhow!("Invalid port number: {value}"))?;
                    parsed.port = Some(port);
                }
                other => bail!("Unknown argument: {other}"),
            }
        }
        Ok(parsed)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = match CliArgs::parse(env::args()) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("Usage: anchorage [--config <path>] [--port <port>] [--version]");
            std::process::exit(2);
        }
    };

    if args.show_version {
        println!("Anchorage version {VERSION}");
        return Ok(());
    }

    let config_path = args.config_path.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut config = match Config::from_file(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration from \"{config_path}\": {e:#}");
            std::process::exit(1);
        }
    };
    if let Some(port) = args.port {
        config.port = port;
    }

    // RUST_LOG wins over the configured level.
    let filter = env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    tracing_subscriber::registry()
        .with(EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().compact().with_ansi(true))
        .init();

    if let Err(e) = server::run(config).await {
        error!("Server runtime error: {:#}", e);
        return Err(e);
    }
    Ok(())
}
