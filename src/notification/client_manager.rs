//! Owns the Slack client for the credential currently in use.

use crate::core::{ClientFactory, MessagingClient};
use anyhow::{Context, Result};
use arc_swap::ArcSwapOption;
use std::sync::Arc;
use tracing::{debug, warn};

/// A client together with the credential it was built for.
struct BoundClient {
    credential: String,
    client: Arc<dyn MessagingClient>,
}

/// Hands out a client for a credential, rebuilding it whenever the
/// credential changes.
///
/// At most one client is held at a time. A replaced client is simply dropped
/// once no in-flight dispatch holds it anymore.
pub struct ClientManager {
    factory: Arc<dyn ClientFactory>,
    current: ArcSwapOption<BoundClient>,
}

impl ClientManager {
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            factory,
            current: ArcSwapOption::empty(),
        }
    }

    /// Returns the client bound to `credential`, building a new one if the
    /// current client was built for a different credential or none exists.
    pub fn ensure_client(&self, credential: &str) -> Result<Arc<dyn MessagingClient>> {
        if let Some(bound) = self.current.load_full() {
            if bound.credential == credential {
                return Ok(bound.client.clone());
            }
        }

        let client = self
            .factory
            .create(credential)
            .context("failed to build Slack client")?;
        client.on_rate_limited(Box::new(|retry_after| {
            warn!(
                retry_after_secs = retry_after.as_secs(),
                "Slack rate limit reached. Retry requested after {} seconds",
                retry_after.as_secs()
            );
        }));
        self.current.store(Some(Arc::new(BoundClient {
            credential: credential.to_string(),
            client: client.clone(),
        })));
        debug!("Built a new Slack client");
        Ok(client)
    }

    /// Whether a client is currently held.
    pub fn has_client(&self) -> bool {
        self.current.load().is_some()
    }
}
