//! Delivers domain events to Slack.
//!
//! Events flow from the [`service`] through the [`dispatcher`], which resolves
//! tagged channels against the [`channel_cache`], posts through a client held
//! by the [`client_manager`], and reports failures via the [`classifier`].
pub mod channel_cache;
pub mod classifier;
pub mod client_manager;
pub mod dispatcher;
pub mod errors;
pub mod service;
pub mod slack;
pub mod tags;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
