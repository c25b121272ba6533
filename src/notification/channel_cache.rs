//! A process-local cache of the Slack channels visible to the current client.
//!
//! The list is fetched lazily on first use and then reused for every event
//! until a recurring timer throws it away, so staleness is bounded by the
//! invalidation window instead of refetching on the hot path.

use crate::core::{Channel, ChannelKind, MessagingClient};
use crate::notification::errors::SlackApiError;
use arc_swap::ArcSwapOption;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, instrument};

/// The conversation kinds every listing asks for.
const LISTED_KINDS: [ChannelKind; 2] = [ChannelKind::Public, ChannelKind::Private];

struct InvalidationTimer {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Time-bounded, lazily populated list of known Slack channels.
pub struct ChannelCache {
    channels: Arc<ArcSwapOption<Vec<Channel>>>,
    window: Duration,
    timer: Mutex<Option<InvalidationTimer>>,
}

impl ChannelCache {
    /// Creates an empty cache whose contents live for at most `window`.
    ///
    /// The invalidation timer is not armed until [`start_invalidation`] is
    /// called.
    ///
    /// [`start_invalidation`]: ChannelCache::start_invalidation
    pub fn new(window: Duration) -> Self {
        Self {
            channels: Arc::new(ArcSwapOption::empty()),
            window,
            timer: Mutex::new(None),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Returns the cached channel list, fetching it from `client` if the
    /// cache is empty.
    ///
    /// An empty listing is cached like any other and is not refetched until
    /// the next invalidation. Two concurrent callers on an empty cache may
    /// both fetch; the last one to finish wins.
    #[instrument(skip_all)]
    pub async fn ensure_populated(
        &self,
        client: &dyn MessagingClient,
    ) -> Result<Arc<Vec<Channel>>, SlackApiError> {
        if let Some(channels) = self.channels.load_full() {
            return Ok(channels);
        }

        let channels = Arc::new(client.list_channels(&LISTED_KINDS).await?);
        metrics::counter!("slack_channel_list_fetches_total").increment(1);
        debug!("Fetched {} Slack channels", channels.len());
        self.channels.store(Some(channels.clone()));
        Ok(channels)
    }

    /// Whether a channel list is currently cached.
    pub fn is_populated(&self) -> bool {
        self.channels.load().is_some()
    }

    /// Drops the cached list so the next lookup refetches it.
    pub fn invalidate(&self) {
        self.channels.store(None);
    }

    /// Arms the recurring timer that clears the cache every `window`.
    ///
    /// Calling this while the timer is already armed does nothing. Must be
    /// called from within a tokio runtime.
    pub fn start_invalidation(&self) {
        let mut slot = self.timer.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_some() {
            return;
        }

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let channels = self.channels.clone();
        let window = self.window;
        let first_tick = Instant::now() + window;
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(first_tick, window);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => {
                        debug!("Channel cache invalidation timer stopped.");
                        break;
                    }
                    _ = ticker.tick() => {
                        channels.store(None);
                        debug!("Slack channel cache invalidated");
                    }
                }
            }
        });

        *slot = Some(InvalidationTimer {
            shutdown_tx,
            handle,
        });
    }

    /// Disarms the invalidation timer. Safe to call repeatedly, and before
    /// the timer was ever armed.
    pub fn stop(&self) {
        let timer = self
            .timer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(timer) = timer {
            let _ = timer.shutdown_tx.send(true);
            timer.handle.abort();
        }
    }

    /// Whether the invalidation timer is currently armed.
    pub fn is_armed(&self) -> bool {
        self.timer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

impl Drop for ChannelCache {
    fn drop(&mut self) {
        self.stop();
    }
}
