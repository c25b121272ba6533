//! Configuration management for SlackRelay
//!
//! This module defines the main `Config` struct and its sub-structs,
//! responsible for holding all application settings. It uses the `figment`
//! crate to load configuration from a `slackrelay.toml` file and merge it
//! with environment variables and command-line arguments.

use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::cli::Cli;

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Configuration for message formatting.
    pub formatter: FormatterConfig,
    /// Configuration for the Slack integration.
    pub slack: SlackConfig,
}

/// Configuration for message formatting.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FormatterConfig {
    /// Base URL of the admin UI that message links point into.
    pub server_url: String,
}

/// Configuration for the Slack integration.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SlackConfig {
    /// The bot access token used to post messages.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Base URL of the Slack Web API.
    pub api_base_url: String,
    /// How long the channel list is cached, in seconds.
    pub cache_seconds: u64,
    /// User agent sent with every Web API request.
    pub user_agent: String,
}

impl SlackConfig {
    pub fn cache_window(&self) -> Duration {
        Duration::from_secs(self.cache_seconds)
    }
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            api_base_url: "https://slack.com/api/".to_string(),
            cache_seconds: 30,
            user_agent: concat!("slackrelay/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Loads the application configuration by layering defaults, the TOML
    /// file named on the command line (if any), `SLACKRELAY_` environment
    /// variables, and finally the command-line arguments themselves.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if let Some(path) = &cli.config {
            figment = figment.merge(Toml::file(path));
        }
        let config: Config = figment
            // e.g. SLACKRELAY_SLACK__ACCESS_TOKEN=xoxb-...
            .merge(Env::prefixed("SLACKRELAY_").split("__"))
            .merge(cli.clone())
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the dispatcher can not run with.
    pub fn validate(&self) -> Result<()> {
        if self.slack.cache_seconds == 0 {
            bail!("slack.cache_seconds must be greater than zero");
        }
        if self.formatter.server_url.trim().is_empty() {
            bail!("formatter.server_url must not be empty");
        }
        Ok(())
    }
}

// Provide a default implementation for tests and easy setup.
impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            formatter: FormatterConfig {
                server_url: "http://localhost:4242".to_string(),
            },
            slack: SlackConfig::default(),
        }
    }
}
