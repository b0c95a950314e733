//! arena - headless client for a real-time multiplayer arena
//!
//! Connects to a game server, predicts local movement at a fixed tick rate and
//! reconciles against server snapshots.

mod config;
mod headless;
mod scripted_input;

use anyhow::Result;
use config::{ClientConfig, DEFAULT_CONFIG_PATH};
use std::{env, path::PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // warn-level logger until the configured filter is known
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("warn"))
        .finish();
    let (cli, mut config) = tracing::subscriber::with_default(bootstrap, || {
        let cli = CliOptions::parse(env::args().skip(1));
        let path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        let config = ClientConfig::load_from_path(&path);
        (cli, config)
    });

    if let Some(url) = cli.server_url.clone() {
        config.server_url = url;
    }
    if let Some(name) = cli.player_name.clone() {
        config.player_name = name;
    }

    if let Some(path) = &cli.write_config {
        config.save_to_path(path)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&config.log_filter))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        server = %config.server_url,
        tick_hz = config.tick_hz,
        "Starting arena v{}",
        env!("CARGO_PKG_VERSION")
    );

    headless::run(headless::HeadlessConfig {
        client: config,
        scripted_input: cli.scripted_input,
        record_inputs: cli.record_inputs,
        max_ticks: cli.max_ticks,
    })?;

    info!("arena shutting down");
    Ok(())
}

#[derive(Debug, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    server_url: Option<String>,
    player_name: Option<String>,
    scripted_input: Option<PathBuf>,
    record_inputs: Option<PathBuf>,
    max_ticks: Option<u64>,
    write_config: Option<PathBuf>,
}

impl CliOptions {
    fn parse<I: Iterator<Item = String>>(mut args: I) -> Self {
        let mut opts = CliOptions::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    if let Some(path) = args.next() {
                        opts.config = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--config requires a file path");
                    }
                }
                "--server" => {
                    if let Some(url) = args.next() {
                        opts.server_url = Some(url);
                    } else {
                        tracing::error!("--server requires a ws:// URL");
                    }
                }
                "--name" => {
                    if let Some(name) = args.next() {
                        opts.player_name = Some(name);
                    } else {
                        tracing::error!("--name requires a value");
                    }
                }
                "--scripted-input" => {
                    if let Some(path) = args.next() {
                        opts.scripted_input = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--scripted-input requires a file path");
                    }
                }
                "--record-inputs" => {
                    if let Some(path) = args.next() {
                        opts.record_inputs = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--record-inputs requires a file path");
                    }
                }
                "--max-ticks" => {
                    if let Some(raw) = args.next() {
                        match raw.parse::<u64>() {
                            Ok(value) => opts.max_ticks = Some(value),
                            Err(err) => {
                                tracing::error!(
                                    %err,
                                    value = %raw,
                                    "--max-ticks must be an integer"
                                );
                            }
                        }
                    } else {
                        tracing::error!("--max-ticks requires an integer");
                    }
                }
                "--write-config" => {
                    if let Some(path) = args.next() {
                        opts.write_config = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--write-config requires a file path");
                    }
                }
                other => tracing::warn!(arg = other, "Ignoring unknown argument"),
            }
        }

        opts
    }
}
