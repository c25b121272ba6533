//! Relays domain events to the Slack channels their tags name.
//!
//! Handling is fire-and-forget: every failure is logged and classified here
//! and never reaches the event source, so a broken Slack integration can not
//! fail the operation that produced the event.

use crate::core::{
    ClientFactory, DispatchParameters, DomainEvent, EventFormatter, LinkAction, OutgoingMessage,
};
use crate::notification::channel_cache::ChannelCache;
use crate::notification::classifier::{classify, FailureCause};
use crate::notification::client_manager::ClientManager;
use crate::notification::tags::tagged_channels;
use anyhow::Result;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Label of the button attached to every message.
pub const ACTION_LABEL: &str = "Open in Unleash";

/// Default lifetime of the cached channel list.
pub const DEFAULT_CACHE_WINDOW: Duration = Duration::from_secs(30);

/// Why an event produced no delivery round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingCredential,
    NoTargetsTagged,
    EmptyChannelCache,
}

impl SkipReason {
    fn label(&self) -> &'static str {
        match self {
            SkipReason::MissingCredential => "missing_credential",
            SkipReason::NoTargetsTagged => "no_targets_tagged",
            SkipReason::EmptyChannelCache => "empty_channel_cache",
        }
    }
}

/// The result of posting to one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(FailureCause),
}

/// What happened to an event handed to [`SlackDispatcher::handle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchReport {
    /// Nothing was posted, by design.
    Skipped(SkipReason),
    /// A delivery round ran; one outcome per eligible channel, keyed by
    /// channel name.
    Dispatched(Vec<(String, DeliveryOutcome)>),
    /// Handling failed before any message was posted.
    Failed(FailureCause),
}

impl DispatchReport {
    /// Number of channels a message was delivered to.
    pub fn delivered(&self) -> usize {
        match self {
            DispatchReport::Dispatched(outcomes) => outcomes
                .iter()
                .filter(|(_, outcome)| *outcome == DeliveryOutcome::Delivered)
                .count(),
            _ => 0,
        }
    }

    /// Number of channels eligible for delivery.
    pub fn eligible(&self) -> usize {
        match self {
            DispatchReport::Dispatched(outcomes) => outcomes.len(),
            _ => 0,
        }
    }
}

/// Fans domain events out to tagged Slack channels.
pub struct SlackDispatcher {
    formatter: Arc<dyn EventFormatter>,
    clients: ClientManager,
    channels: ChannelCache,
}

impl SlackDispatcher {
    /// Creates a dispatcher and arms its channel cache invalidation timer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        factory: Arc<dyn ClientFactory>,
        formatter: Arc<dyn EventFormatter>,
        cache_window: Duration,
    ) -> Self {
        let channels = ChannelCache::new(cache_window);
        channels.start_invalidation();
        Self {
            formatter,
            clients: ClientManager::new(factory),
            channels,
        }
    }

    /// The channel cache backing this dispatcher.
    pub fn channel_cache(&self) -> &ChannelCache {
        &self.channels
    }

    /// Posts `event` to every cached channel its tags name.
    ///
    /// Never fails: problems are logged and reflected in the returned report
    /// only.
    #[instrument(skip_all, fields(event_type = %event.event_type))]
    pub async fn handle(&self, event: &DomainEvent, parameters: &DispatchParameters) -> DispatchReport {
        let report = match self.dispatch(event, parameters).await {
            Ok(report) => report,
            Err(e) => DispatchReport::Failed(classify(event, &e)),
        };
        if let DispatchReport::Skipped(reason) = &report {
            metrics::counter!("slack_events_skipped_total", "reason" => reason.label())
                .increment(1);
        }
        report
    }

    async fn dispatch(
        &self,
        event: &DomainEvent,
        parameters: &DispatchParameters,
    ) -> Result<DispatchReport> {
        let access_token = match parameters.access_token.as_deref() {
            Some(token) if !token.is_empty() => token,
            _ => {
                warn!("No access token provided.");
                return Ok(DispatchReport::Skipped(SkipReason::MissingCredential));
            }
        };

        let tagged = tagged_channels(&event.tags);
        if tagged.is_empty() {
            debug!("No Slack channels tagged for event {}", event.event_type);
            return Ok(DispatchReport::Skipped(SkipReason::NoTargetsTagged));
        }

        let client = self.clients.ensure_client(access_token)?;
        let all_channels = self.channels.ensure_populated(client.as_ref()).await?;
        if all_channels.is_empty() {
            warn!("No Slack channels found.");
            return Ok(DispatchReport::Skipped(SkipReason::EmptyChannelCache));
        }

        let text = self.formatter.format(event)?;
        let url = self.formatter.link(event)?;

        let tagged: HashSet<&str> = tagged.iter().map(String::as_str).collect();
        let targets: Vec<(&str, &str)> = all_channels
            .iter()
            .filter_map(|channel| match (&channel.id, &channel.name) {
                (Some(id), Some(name)) if tagged.contains(name.as_str()) => {
                    Some((id.as_str(), name.as_str()))
                }
                _ => None,
            })
            .collect();

        let requests = targets.iter().map(|(id, _)| {
            let message = OutgoingMessage {
                channel_id: id.to_string(),
                text: text.clone(),
                action: LinkAction {
                    label: ACTION_LABEL.to_string(),
                    url: url.clone(),
                },
            };
            let client = client.clone();
            async move { client.post_message(&message).await }
        });
        let results = join_all(requests).await;

        let outcomes: Vec<(String, DeliveryOutcome)> = targets
            .iter()
            .zip(results)
            .map(|((_, name), result)| {
                let outcome = match result {
                    Ok(()) => {
                        metrics::counter!("slack_messages_sent_total").increment(1);
                        DeliveryOutcome::Delivered
                    }
                    Err(e) => DeliveryOutcome::Failed(classify(event, &e.into())),
                };
                (name.to_string(), outcome)
            })
            .collect();

        let report = DispatchReport::Dispatched(outcomes);
        info!(
            "Handled event {} dispatching {} out of {} messages successfully.",
            event.event_type,
            report.delivered(),
            report.eligible()
        );
        Ok(report)
    }

    /// Stops background activity. Safe to call more than once.
    pub fn destroy(&self) {
        self.channels.stop();
    }
}

impl Drop for SlackDispatcher {
    fn drop(&mut self) {
        self.destroy();
    }
}
