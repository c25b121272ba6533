//! Turns delivery failures into warnings a human can act on.

use crate::core::DomainEvent;
use crate::notification::errors::SlackApiError;
use std::fmt;
use tracing::warn;

/// Why a notification was not delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    Platform,
    Transport,
    Throttling { retry_after: u64 },
    Http { status_code: u16 },
    Unclassified,
}

impl FailureCause {
    /// Short label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            FailureCause::Platform => "platform",
            FailureCause::Transport => "transport",
            FailureCause::Throttling { .. } => "throttling",
            FailureCause::Http { .. } => "http",
            FailureCause::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Logs a warning describing why handling `event` failed.
///
/// Errors that are not a [`SlackApiError`] carry no recognizable failure code
/// and are logged as they are.
pub fn classify(event: &DomainEvent, error: &anyhow::Error) -> FailureCause {
    let cause = match error.downcast_ref::<SlackApiError>() {
        Some(api_error) => classify_api_error(event, api_error),
        None => {
            warn!(
                event_type = %event.event_type,
                "Error handling event {}. {:#}",
                event.event_type,
                error
            );
            FailureCause::Unclassified
        }
    };
    metrics::counter!("slack_messages_failed_total", "cause" => cause.label()).increment(1);
    cause
}

fn classify_api_error(event: &DomainEvent, error: &SlackApiError) -> FailureCause {
    let event_type = &event.event_type;
    match error {
        SlackApiError::Platform { data, .. } => {
            warn!(
                event_type = %event_type,
                "Error handling event {}. A platform error occurred: {}",
                event_type,
                data
            );
            FailureCause::Platform
        }
        SlackApiError::Request { original } => {
            warn!(
                event_type = %event_type,
                "Error handling event {}. A request error occurred: {}",
                event_type,
                original
            );
            FailureCause::Transport
        }
        SlackApiError::RateLimited { retry_after } => {
            warn!(
                event_type = %event_type,
                retry_after,
                "Error handling event {}. A rate limit error occurred: retry after {} seconds",
                event_type,
                retry_after
            );
            FailureCause::Throttling {
                retry_after: *retry_after,
            }
        }
        SlackApiError::Http { status_code, .. } => {
            warn!(
                event_type = %event_type,
                status_code,
                "Error handling event {}. An HTTP error occurred: status code {}",
                event_type,
                status_code
            );
            FailureCause::Http {
                status_code: *status_code,
            }
        }
        SlackApiError::Unknown { .. } => {
            warn!(
                event_type = %event_type,
                "Error handling event {}. {}",
                event_type,
                error
            );
            FailureCause::Unclassified
        }
    }
}
