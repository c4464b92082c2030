//! ampctl - headless console for a Control4 multi-zone amplifier.
//!
//! Reads one command per line from stdin and drives the amplifier through
//! c4amp-core. Zone events are logged as they happen.

mod commands;
mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use c4amp_core::protocol_constants::EVENT_CHANNEL_CAPACITY;
use c4amp_core::{bootstrap_amplifier, BroadcastEvent, BroadcastEventBridge};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;

use crate::commands::{execute, parse, Flow, HELP};
use crate::config::CtlConfig;

/// ampctl - Control4 multi-zone amplifier console.
#[derive(Parser, Debug)]
#[command(name = "ampctl")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "AMPCTL_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Amplifier host (overrides config file).
    #[arg(long)]
    host: Option<String>,

    /// Amplifier UDP port (overrides config file).
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Do not wait for a reply after each command.
    #[arg(long)]
    no_wait: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("ampctl v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        CtlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if args.no_wait {
        config.await_responses = false;
    }

    log::info!(
        "Configuration: amplifier={}:{}, await_responses={}",
        config.host,
        config.port,
        config.await_responses
    );

    let bridge = Arc::new(BroadcastEventBridge::new(EVENT_CHANNEL_CAPACITY));
    let services = bootstrap_amplifier(&config.to_core_config(), bridge.clone())
        .context("Failed to bootstrap amplifier. Set a host with --host or AMPCTL_HOST")?;

    let event_task = tokio::spawn(log_events(bridge.subscribe()));

    services
        .start()
        .await
        .context("Failed to open amplifier transport")?;

    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = &mut shutdown => {
                log::info!("Shutdown signal received");
                break;
            }
        };

        // EOF
        let Some(line) = line else { break };

        let command = match parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("error: {:#}", e);
                continue;
            }
        };

        match execute(&services, command).await {
            Ok((flow, text)) => {
                println!("{}", text);
                if flow == Flow::Quit {
                    break;
                }
            }
            Err(e) => println!("error: {:#}", e),
        }
    }

    services.shutdown().await;
    event_task.abort();

    log::info!("Shutdown complete");
    Ok(())
}

/// Logs events from the bridge until the channel closes.
async fn log_events(mut rx: tokio::sync::broadcast::Receiver<BroadcastEvent>) {
    loop {
        match rx.recv().await {
            Ok(BroadcastEvent::Zone(event)) => log::info!("[Event] {:?}", event),
            Ok(BroadcastEvent::Amplifier(event)) => log::debug!("[Event] {:?}", event),
            Err(RecvError::Lagged(skipped)) => {
                log::warn!("[Event] Skipped {} event(s)", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
