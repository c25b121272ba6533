//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using the
//! `clap` crate. These arguments are parsed at startup and then merged with
//! the configuration from the `slackrelay.toml` file and environment variables.

use clap::Parser;
use figment::{
    value::{Dict, Map, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Relays domain events to the Slack channels they are tagged with.
#[derive(Parser, Debug, Default, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// File of newline-delimited JSON events. Reads stdin when omitted.
    #[arg(short, long, value_name = "FILE")]
    pub events: Option<PathBuf>,

    /// Slack bot access token.
    #[arg(long, value_name = "TOKEN")]
    pub access_token: Option<String>,

    /// Base URL of the admin UI used in message links.
    #[arg(long, value_name = "URL")]
    pub server_url: Option<String>,

    /// Lifetime of the cached Slack channel list in seconds.
    #[arg(long, value_name = "SECONDS")]
    pub cache_seconds: Option<u64>,

    /// Logging level (e.g. "debug", "info").
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();
        let mut slack = Dict::new();

        if let Some(token) = &self.access_token {
            slack.insert("access_token".into(), Value::from(token.clone()));
        }

        if let Some(seconds) = self.cache_seconds {
            slack.insert("cache_seconds".into(), Value::from(seconds));
        }

        if !slack.is_empty() {
            dict.insert("slack".into(), Value::from(slack));
        }

        if let Some(url) = &self.server_url {
            let mut formatter = Dict::new();
            formatter.insert("server_url".into(), Value::from(url.clone()));
            dict.insert("formatter".into(), Value::from(formatter));
        }

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
