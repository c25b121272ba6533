//! Core domain types and service traits for SlackRelay
//!
//! This module defines the fundamental data structures and trait contracts
//! that govern component interactions throughout the application.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::notification::errors::SlackApiError;

/// The tag type that marks a tag value as a Slack channel name.
pub const SLACK_TAG_TYPE: &str = "slack";

/// A typed key/value annotation attached to a domain event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EventTag {
    /// The kind of tag, e.g. "slack" or "simple".
    #[serde(rename = "type")]
    pub tag_type: String,
    /// The tag value. For Slack tags this is a channel name.
    pub value: String,
}

impl EventTag {
    pub fn new(tag_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            tag_type: tag_type.into(),
            value: value.into(),
        }
    }

    /// Shorthand for a tag that names a Slack channel.
    pub fn slack(channel: impl Into<String>) -> Self {
        Self::new(SLACK_TAG_TYPE, channel)
    }
}

/// An internal domain event, as handed to the dispatcher by the event source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DomainEvent {
    /// The event type, e.g. "feature-created".
    #[serde(rename = "type")]
    pub event_type: String,
    /// The user or system that triggered the event.
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_by: String,
    /// When the event happened.
    #[serde(default = "Utc::now", deserialize_with = "null_as_now")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Tags used to select delivery destinations. `null` means no tags.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<EventTag>,
    /// Free-form event payload.
    #[serde(default)]
    pub data: serde_json::Value,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_now<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<DateTime<Utc>>::deserialize(deserializer)?.unwrap_or_else(Utc::now))
}

impl Default for DomainEvent {
    fn default() -> Self {
        Self {
            event_type: String::new(),
            created_by: String::new(),
            created_at: Utc::now(),
            feature_name: None,
            project: None,
            environment: None,
            tags: Vec::new(),
            data: serde_json::Value::Null,
        }
    }
}

/// Per-call parameters supplied alongside an event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DispatchParameters {
    /// The Slack bot access token.
    #[serde(default)]
    pub access_token: Option<String>,
}

impl DispatchParameters {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
        }
    }
}

/// A Slack conversation as returned by the channel listing.
///
/// Both fields are optional on the wire; only channels carrying both are
/// eligible delivery targets.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Channel {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
        }
    }
}

/// The conversation kinds requested when listing channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Public,
    Private,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Public => "public_channel",
            ChannelKind::Private => "private_channel",
        }
    }
}

/// A clickable button attached to a posted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkAction {
    pub label: String,
    pub url: String,
}

/// A message ready to be posted to one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub channel_id: String,
    pub text: String,
    pub action: LinkAction,
}

/// Callback invoked when the platform asks the client to back off.
pub type RateLimitObserver = Box<dyn Fn(Duration) + Send + Sync>;

// =============================================================================
// Service Traits
// =============================================================================

/// A client bound to a single Slack credential.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Lists the conversations of the given kinds visible to the credential.
    async fn list_channels(&self, kinds: &[ChannelKind]) -> Result<Vec<Channel>, SlackApiError>;

    /// Posts a message to a single channel.
    async fn post_message(&self, message: &OutgoingMessage) -> Result<(), SlackApiError>;

    /// Registers a callback that fires whenever a rate-limit response is seen.
    fn on_rate_limited(&self, observer: RateLimitObserver);
}

/// Builds clients bound to a credential.
pub trait ClientFactory: Send + Sync {
    /// Creates a new client for `credential`.
    ///
    /// # Returns
    /// * `Ok(client)` with a client ready for use
    /// * `Err` if the underlying transport could not be configured
    fn create(&self, credential: &str) -> Result<Arc<dyn MessagingClient>>;
}

/// Renders a domain event into message text and a deep link.
pub trait EventFormatter: Send + Sync {
    /// The message body for `event`.
    fn format(&self, event: &DomainEvent) -> Result<String>;

    /// A canonical URL pointing at the subject of `event`.
    fn link(&self, event: &DomainEvent) -> Result<String>;
}
