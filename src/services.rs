//! Encapsulation for setting up the dispatch pipeline.

use crate::{
    config::Config,
    core::{DispatchParameters, DomainEvent},
    formatting::{FeatureEventFormatter, LinkStyle},
    notification::{dispatcher::SlackDispatcher, service::DispatcherService, slack::SlackClientFactory},
};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Builds a dispatcher wired to the real Slack Web API.
pub fn build_dispatcher(config: &Config) -> Result<Arc<SlackDispatcher>> {
    let formatter = FeatureEventFormatter::new(&config.formatter.server_url, LinkStyle::Slack)?;
    let factory = SlackClientFactory::new(config.slack.clone());
    Ok(Arc::new(SlackDispatcher::new(
        Arc::new(factory),
        Arc::new(formatter),
        config.slack.cache_window(),
    )))
}

/// Starts the dispatch pipeline.
///
/// Returns the sender events should be published on and the handle of the
/// service task, which finishes once the sender side is dropped or
/// `shutdown_rx` fires.
pub fn setup_dispatch_pipeline(
    config: &Config,
    capacity: usize,
    shutdown_rx: watch::Receiver<bool>,
) -> Result<(mpsc::Sender<DomainEvent>, JoinHandle<()>)> {
    if config.slack.access_token.as_deref().map_or(true, str::is_empty) {
        warn!("No Slack access token configured. Events will be logged and skipped.");
    }

    let dispatcher = build_dispatcher(config)?;
    let parameters = DispatchParameters {
        access_token: config.slack.access_token.clone(),
    };
    let (tx, rx) = mpsc::channel::<DomainEvent>(capacity);
    let service = DispatcherService::new(dispatcher, parameters);
    let handle = tokio::spawn(service.run(rx, shutdown_rx));
    info!("Slack dispatch pipeline enabled.");
    Ok((tx, handle))
}
