//! The dispatcher service is a long-running task that pulls domain events off
//! an event channel and hands each one to the [`SlackDispatcher`].

use crate::core::{DispatchParameters, DomainEvent};
use crate::notification::dispatcher::SlackDispatcher;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// Runs the dispatcher against an event stream.
pub struct DispatcherService {
    dispatcher: Arc<SlackDispatcher>,
    parameters: DispatchParameters,
}

impl DispatcherService {
    /// Creates a new `DispatcherService` that handles every event with the
    /// same `parameters`.
    pub fn new(dispatcher: Arc<SlackDispatcher>, parameters: DispatchParameters) -> Self {
        Self {
            dispatcher,
            parameters,
        }
    }

    /// Runs the service's main loop.
    ///
    /// Each event is handled on its own task so a slow delivery round never
    /// holds up the next event. The loop ends when the shutdown signal fires
    /// or the channel closes; in-flight deliveries are allowed to settle and
    /// the channel cache timer is stopped before returning.
    pub async fn run(
        self,
        mut event_rx: mpsc::Receiver<DomainEvent>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        info!("Slack dispatcher service started.");
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    info!("Dispatcher service received shutdown signal.");
                    break;
                }
                received = event_rx.recv() => {
                    match received {
                        Some(event) => {
                            let dispatcher = self.dispatcher.clone();
                            let parameters = self.parameters.clone();
                            in_flight.spawn(async move {
                                dispatcher.handle(&event, &parameters).await;
                            });
                        }
                        None => {
                            info!("Event channel closed. Shutting down dispatcher service.");
                            break;
                        }
                    }
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        error!("Dispatch task panicked: {}", e);
                    }
                }
            }
        }

        debug!("Waiting for {} in-flight dispatches.", in_flight.len());
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                error!("Dispatch task panicked: {}", e);
            }
        }
        self.dispatcher.destroy();
        info!("Slack dispatcher service stopped.");
    }
}
