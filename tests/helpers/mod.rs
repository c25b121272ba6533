//! Shared fixtures for the integration tests.

#![allow(dead_code)]

pub mod test_metrics;

use slackrelay::core::{Channel, DispatchParameters, DomainEvent, EventTag};
use slackrelay::notification::dispatcher::SlackDispatcher;
use slackrelay::notification::test_utils::{FakeClientFactory, FakeSlackClient, StaticFormatter};
use std::sync::Arc;
use std::time::Duration;

/// A dispatcher wired to in-memory fakes.
pub struct TestDispatcher {
    pub dispatcher: SlackDispatcher,
    pub factory: Arc<FakeClientFactory>,
    pub client: Arc<FakeSlackClient>,
}

impl TestDispatcher {
    pub fn new(channels: Vec<Channel>) -> Self {
        Self::with_window(channels, Duration::from_secs(30))
    }

    pub fn with_window(channels: Vec<Channel>, window: Duration) -> Self {
        let client = Arc::new(FakeSlackClient::with_channels(channels));
        let factory = Arc::new(FakeClientFactory::new(client.clone()));
        let dispatcher = SlackDispatcher::new(
            factory.clone(),
            Arc::new(StaticFormatter::default()),
            window,
        );
        Self {
            dispatcher,
            factory,
            client,
        }
    }
}

/// Channels "A", "B" and "C" with ids "C_A", "C_B" and "C_C".
pub fn abc_channels() -> Vec<Channel> {
    vec![
        Channel::new("C_A", "A"),
        Channel::new("C_B", "B"),
        Channel::new("C_C", "C"),
    ]
}

/// A feature event tagged with the given Slack channels.
pub fn event_tagged(channels: &[&str]) -> DomainEvent {
    DomainEvent {
        event_type: "feature-created".to_string(),
        created_by: "tester".to_string(),
        feature_name: Some("checkout".to_string()),
        project: Some("default".to_string()),
        tags: channels.iter().map(|c| EventTag::slack(*c)).collect(),
        ..Default::default()
    }
}

pub fn params(token: &str) -> DispatchParameters {
    DispatchParameters::with_token(token)
}
