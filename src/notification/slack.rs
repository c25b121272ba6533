//! A client for the Slack Web API.

use crate::config::SlackConfig;
use crate::core::{
    Channel, ChannelKind, ClientFactory, MessagingClient, OutgoingMessage, RateLimitObserver,
};
use crate::notification::errors::SlackApiError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header::RETRY_AFTER, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Page size requested from `conversations.list`.
const CHANNEL_PAGE_LIMIT: u32 = 200;

/// Upper bound on `conversations.list` pages fetched for one listing.
const MAX_CHANNEL_PAGES: usize = 100;

#[derive(Debug, Deserialize)]
struct ConversationsPage {
    #[serde(default)]
    channels: Vec<Channel>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

/// A Slack Web API client bound to a single bot token.
pub struct SlackWebClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
    observers: Mutex<Vec<RateLimitObserver>>,
}

impl SlackWebClient {
    /// Creates a new `SlackWebClient` for `token`.
    pub fn new(token: &str, config: &SlackConfig) -> Result<Self> {
        let mut base = config.api_base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url =
            Url::parse(&base).with_context(|| format!("invalid Slack API url {base:?}"))?;
        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url,
            token: token.to_string(),
            observers: Mutex::new(Vec::new()),
        })
    }

    fn method_url(&self, method: &str) -> Result<Url, SlackApiError> {
        self.base_url
            .join(method)
            .map_err(|e| SlackApiError::request(format!("invalid method url {method}: {e}")))
    }

    fn notify_rate_limited(&self, retry_after: Duration) {
        let observers = self.observers.lock().unwrap_or_else(|e| e.into_inner());
        for observer in observers.iter() {
            observer(retry_after);
        }
    }

    /// Sends a Web API request and unwraps the `{ ok, ... }` envelope.
    async fn call(&self, request: RequestBuilder) -> Result<Value, SlackApiError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(SlackApiError::request)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
                .unwrap_or(0);
            self.notify_rate_limited(Duration::from_secs(retry_after));
            return Err(SlackApiError::rate_limited(retry_after));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SlackApiError::http(status.as_u16(), body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SlackApiError::request(format!("invalid response body: {e}")))?;
        if body.get("ok").and_then(Value::as_bool) == Some(true) {
            Ok(body)
        } else {
            let error = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error")
                .to_string();
            Err(SlackApiError::platform(error, body))
        }
    }
}

#[async_trait]
impl MessagingClient for SlackWebClient {
    /// Lists all conversations of the given kinds, following pagination.
    #[instrument(skip_all)]
    async fn list_channels(&self, kinds: &[ChannelKind]) -> Result<Vec<Channel>, SlackApiError> {
        let types = kinds
            .iter()
            .map(ChannelKind::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let url = self.method_url("conversations.list")?;
        let limit = CHANNEL_PAGE_LIMIT.to_string();

        let mut channels = Vec::new();
        let mut cursor = String::new();
        let mut seen_cursors = HashSet::new();
        for page_number in 1..=MAX_CHANNEL_PAGES {
            let mut query = vec![
                ("types", types.as_str()),
                ("limit", limit.as_str()),
                ("exclude_archived", "true"),
            ];
            if !cursor.is_empty() {
                query.push(("cursor", cursor.as_str()));
            }

            let body = self.call(self.http.get(url.clone()).query(&query)).await?;
            let page: ConversationsPage = serde_json::from_value(body).map_err(|e| {
                SlackApiError::request(format!("invalid conversations.list response: {e}"))
            })?;
            channels.extend(page.channels);

            cursor = page
                .response_metadata
                .map(|meta| meta.next_cursor)
                .unwrap_or_default();
            if cursor.is_empty() {
                break;
            }
            if !seen_cursors.insert(cursor.clone()) {
                warn!("Slack repeated pagination cursor {cursor:?}; keeping the channels listed so far");
                break;
            }
            if page_number == MAX_CHANNEL_PAGES {
                warn!("Stopped listing Slack channels after {MAX_CHANNEL_PAGES} pages");
                break;
            }
            debug!("Fetching next page of Slack channels");
        }

        Ok(channels)
    }

    /// Posts `message` with a single link button attached.
    #[instrument(skip_all, fields(channel = %message.channel_id))]
    async fn post_message(&self, message: &OutgoingMessage) -> Result<(), SlackApiError> {
        let payload = json!({
            "channel": message.channel_id,
            "text": message.text,
            "attachments": [{
                "actions": [{
                    "name": "featureToggle",
                    "text": message.action.label,
                    "type": "button",
                    "value": "featureToggle",
                    "style": "primary",
                    "url": message.action.url,
                }],
            }],
        });
        let url = self.method_url("chat.postMessage")?;
        self.call(self.http.post(url).json(&payload)).await?;
        Ok(())
    }

    fn on_rate_limited(&self, observer: RateLimitObserver) {
        self.observers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(observer);
    }
}

/// Builds [`SlackWebClient`]s that share the configured API settings.
#[derive(Debug, Clone)]
pub struct SlackClientFactory {
    config: SlackConfig,
}

impl SlackClientFactory {
    pub fn new(config: SlackConfig) -> Self {
        Self { config }
    }
}

impl ClientFactory for SlackClientFactory {
    fn create(&self, credential: &str) -> Result<Arc<dyn MessagingClient>> {
        Ok(Arc::new(SlackWebClient::new(credential, &self.config)?))
    }
}
