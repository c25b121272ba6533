//! In-memory Slack doubles shared by unit and integration tests.

use crate::core::{
    Channel, ChannelKind, ClientFactory, DomainEvent, EventFormatter, MessagingClient,
    OutgoingMessage, RateLimitObserver,
};
use crate::notification::errors::SlackApiError;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A fake Slack client that records every call made against it.
#[derive(Default)]
pub struct FakeSlackClient {
    channels: Mutex<Vec<Channel>>,
    list_error: Mutex<Option<SlackApiError>>,
    post_failures: Mutex<HashMap<String, SlackApiError>>,
    post_delay: Mutex<Option<Duration>>,
    posts: Mutex<Vec<OutgoingMessage>>,
    list_calls: AtomicUsize,
    list_kinds: Mutex<Vec<Vec<ChannelKind>>>,
    observers: Mutex<Vec<RateLimitObserver>>,
}

impl FakeSlackClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channels(channels: Vec<Channel>) -> Self {
        let client = Self::new();
        client.set_channels(channels);
        client
    }

    pub fn set_channels(&self, channels: Vec<Channel>) {
        *self.channels.lock().unwrap() = channels;
    }

    /// Makes every subsequent channel listing fail with `error`.
    pub fn fail_listing(&self, error: SlackApiError) {
        *self.list_error.lock().unwrap() = Some(error);
    }

    /// Makes posts to `channel_id` fail with `error`.
    pub fn fail_posts_to(&self, channel_id: &str, error: SlackApiError) {
        self.post_failures
            .lock()
            .unwrap()
            .insert(channel_id.to_string(), error);
    }

    /// Makes every post take `delay` before it settles.
    pub fn delay_posts(&self, delay: Duration) {
        *self.post_delay.lock().unwrap() = Some(delay);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn list_kinds(&self) -> Vec<Vec<ChannelKind>> {
        self.list_kinds.lock().unwrap().clone()
    }

    /// Every message a post was attempted for, successful or not.
    pub fn posts(&self) -> Vec<OutgoingMessage> {
        self.posts.lock().unwrap().clone()
    }

    pub fn posted_channel_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.posts().into_iter().map(|m| m.channel_id).collect();
        ids.sort();
        ids
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().unwrap().len()
    }

    /// Simulates Slack asking the client to back off.
    pub fn trigger_rate_limit(&self, retry_after: Duration) {
        for observer in self.observers.lock().unwrap().iter() {
            observer(retry_after);
        }
    }
}

#[async_trait]
impl MessagingClient for FakeSlackClient {
    async fn list_channels(&self, kinds: &[ChannelKind]) -> Result<Vec<Channel>, SlackApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.list_kinds.lock().unwrap().push(kinds.to_vec());
        if let Some(error) = self.list_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self.channels.lock().unwrap().clone())
    }

    async fn post_message(&self, message: &OutgoingMessage) -> Result<(), SlackApiError> {
        self.posts.lock().unwrap().push(message.clone());
        let delay = *self.post_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.post_failures.lock().unwrap().get(&message.channel_id) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn on_rate_limited(&self, observer: RateLimitObserver) {
        self.observers.lock().unwrap().push(observer);
    }
}

/// A factory that always hands out the same fake client and records the
/// credentials it was asked to build clients for.
pub struct FakeClientFactory {
    client: Arc<FakeSlackClient>,
    credentials: Mutex<Vec<String>>,
    fail: bool,
}

impl FakeClientFactory {
    pub fn new(client: Arc<FakeSlackClient>) -> Self {
        Self {
            client,
            credentials: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// A factory whose every `create` call fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Arc::new(FakeSlackClient::new()))
        }
    }

    pub fn client(&self) -> Arc<FakeSlackClient> {
        self.client.clone()
    }

    /// Credentials clients were built for, in order.
    pub fn created_for(&self) -> Vec<String> {
        self.credentials.lock().unwrap().clone()
    }
}

impl ClientFactory for FakeClientFactory {
    fn create(&self, credential: &str) -> Result<Arc<dyn MessagingClient>> {
        if self.fail {
            anyhow::bail!("refusing to build a client");
        }
        self.credentials.lock().unwrap().push(credential.to_string());
        Ok(self.client.clone())
    }
}

/// A formatter with fixed output.
pub struct StaticFormatter {
    pub text: String,
    pub link: String,
}

impl Default for StaticFormatter {
    fn default() -> Self {
        Self {
            text: "something happened".to_string(),
            link: "http://unleash.test/features".to_string(),
        }
    }
}

impl EventFormatter for StaticFormatter {
    fn format(&self, _event: &DomainEvent) -> Result<String> {
        Ok(self.text.clone())
    }

    fn link(&self, _event: &DomainEvent) -> Result<String> {
        Ok(self.link.clone())
    }
}

/// A formatter that always fails.
pub struct FailingFormatter;

impl EventFormatter for FailingFormatter {
    fn format(&self, event: &DomainEvent) -> Result<String> {
        anyhow::bail!("cannot format event {}", event.event_type)
    }

    fn link(&self, event: &DomainEvent) -> Result<String> {
        anyhow::bail!("cannot link event {}", event.event_type)
    }
}
