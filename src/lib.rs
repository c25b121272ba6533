/// SlackRelay - Relays domain events to tagged Slack channels
///
/// This library provides the dispatcher that resolves the channels an event
/// is tagged with, keeps a time-bounded channel cache, fans messages out
/// concurrently and classifies delivery failures.
pub mod cli;
pub mod config;
pub mod core;
pub mod formatting;
pub mod notification;
pub mod services;

// Re-export core types for convenience
pub use crate::core::*;
