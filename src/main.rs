//! SlackRelay - Domain event to Slack relay
//!
//! Reads newline-delimited JSON domain events and relays each one to the
//! Slack channels it is tagged with.

use anyhow::{Context, Result};
use clap::Parser;
use slackrelay::{cli::Cli, config::Config, core::DomainEvent, services::setup_dispatch_pipeline};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Capacity of the queue between the event reader and the dispatcher.
const EVENT_QUEUE_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = Config::load(&cli).context("failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("SlackRelay starting up...");
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Server URL: {}", config.formatter.server_url);
    info!("Slack API: {}", config.slack.api_base_url);
    info!("Channel Cache Window: {}s", config.slack.cache_seconds);
    info!(
        "Access Token: {}",
        if config.slack.access_token.is_some() {
            "Configured"
        } else {
            "Missing"
        }
    );
    info!("-------------------------------------------------------");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (event_tx, service_handle) =
        setup_dispatch_pipeline(&config, EVENT_QUEUE_CAPACITY, shutdown_rx)?;

    let relayed = match &cli.events {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open events file {}", path.display()))?;
            tokio::select! {
                relayed = relay_events(BufReader::new(file), &event_tx) => relayed?,
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received. Shutting down gracefully...");
                    let _ = shutdown_tx.send(true);
                    0
                }
            }
        }
        None => {
            tokio::select! {
                relayed = relay_events(BufReader::new(tokio::io::stdin()), &event_tx) => relayed?,
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received. Shutting down gracefully...");
                    let _ = shutdown_tx.send(true);
                    0
                }
            }
        }
    };

    // Closing the queue lets the service drain in-flight dispatches and exit.
    drop(event_tx);
    if let Err(e) = service_handle.await {
        error!("Dispatcher service panicked: {:?}", e);
    }

    info!("Relayed {} events. Exiting.", relayed);
    Ok(())
}

/// Parses one event per line from `reader` and queues it for dispatch.
///
/// Blank lines are ignored and malformed lines are logged and skipped.
async fn relay_events<R>(reader: R, event_tx: &tokio::sync::mpsc::Sender<DomainEvent>) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut relayed = 0;
    let mut line_number = 0;

    while let Some(line) = lines.next_line().await.context("failed to read events")? {
        line_number += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<DomainEvent>(line) {
            Ok(event) => {
                if event_tx.send(event).await.is_err() {
                    warn!("Dispatcher service stopped; no more events will be relayed.");
                    break;
                }
                relayed += 1;
            }
            Err(e) => {
                warn!(line = line_number, "Skipping malformed event: {}", e);
            }
        }
    }

    Ok(relayed)
}
