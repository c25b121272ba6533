// src/formatting.rs

use crate::core::{DomainEvent, EventFormatter};
use anyhow::{anyhow, Context, Result};
use reqwest::Url;

/// How links are embedded in message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStyle {
    /// `<url|label>`, as Slack mrkdwn expects.
    Slack,
    /// `[label](url)`.
    Markdown,
}

/// A formatter for feature toggle events that creates a short, readable and
/// actionable message.
pub struct FeatureEventFormatter {
    server_url: Url,
    style: LinkStyle,
}

impl FeatureEventFormatter {
    /// Creates a formatter linking into the admin UI at `server_url`.
    pub fn new(server_url: &str, style: LinkStyle) -> Result<Self> {
        let mut server_url =
            Url::parse(server_url).with_context(|| format!("invalid server url {server_url:?}"))?;
        if server_url.cannot_be_a_base() {
            anyhow::bail!("server url {server_url} cannot be used as a base for links");
        }
        // Keep the base path when joining segments below.
        server_url
            .path_segments_mut()
            .map_err(|_| anyhow!("server url cannot be a base"))?
            .pop_if_empty();
        Ok(Self { server_url, style })
    }

    fn url_with_segments(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.server_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("server url cannot be a base"))?
            .extend(segments);
        Ok(url)
    }

    fn anchor(&self, label: &str, url: &str) -> String {
        match self.style {
            LinkStyle::Slack => format!("<{}|{}>", url, label),
            LinkStyle::Markdown => format!("[{}]({})", label, url),
        }
    }

    fn feature_line(&self, event: &DomainEvent, feature: &str) -> Result<String> {
        let user = display_user(event);
        let link = self.link(event)?;
        let feature = self.anchor(feature, &link);
        let environment = event.environment.as_deref().unwrap_or("default");

        let action = match event.event_type.as_str() {
            "feature-created" => format!("created feature toggle {}", feature),
            "feature-updated" | "feature-metadata-updated" => {
                format!("updated feature toggle {}", feature)
            }
            "feature-archived" => format!("archived feature toggle {}", feature),
            "feature-revived" => format!("revived feature toggle {}", feature),
            "feature-stale-on" => format!("marked {} as stale", feature),
            "feature-stale-off" => format!("removed the stale marking on {}", feature),
            "feature-strategy-add" => {
                format!("added a new strategy to {} in *{}*", feature, environment)
            }
            "feature-strategy-update" => {
                format!("updated a strategy on {} in *{}*", feature, environment)
            }
            "feature-strategy-remove" => {
                format!("removed a strategy from {} in *{}*", feature, environment)
            }
            "feature-environment-enabled" => {
                format!("*enabled* {} in *{}*", feature, environment)
            }
            "feature-environment-disabled" => {
                format!("*disabled* {} in *{}*", feature, environment)
            }
            "feature-tagged" => format!("tagged {}", feature),
            "feature-untagged" => format!("untagged {}", feature),
            "feature-project-change" => format!("moved {} to a new project", feature),
            other => format!("triggered *{}* on {}", other, feature),
        };

        let mut line = format!("{} {}", user, action);
        if let Some(project) = &event.project {
            line.push_str(&format!(" in project *{}*", project));
        }
        Ok(line)
    }
}

impl EventFormatter for FeatureEventFormatter {
    fn format(&self, event: &DomainEvent) -> Result<String> {
        match &event.feature_name {
            Some(feature) => self.feature_line(event, feature),
            None if event.event_type.starts_with("feature-") => Err(anyhow!(
                "event {} is missing a feature name",
                event.event_type
            )),
            None => {
                let link = self.link(event)?;
                Ok(format!(
                    "{} triggered *{}*. {}",
                    display_user(event),
                    event.event_type,
                    self.anchor("See event log", &link)
                ))
            }
        }
    }

    fn link(&self, event: &DomainEvent) -> Result<String> {
        let url = match (&event.project, &event.feature_name) {
            (Some(project), Some(feature)) => {
                self.url_with_segments(&["projects", project.as_str(), "features", feature.as_str()])?
            }
            (None, Some(feature)) => self.url_with_segments(&["features", feature.as_str()])?,
            _ => self.url_with_segments(&["history"])?,
        };
        Ok(url.to_string())
    }
}

fn display_user(event: &DomainEvent) -> String {
    if event.created_by.is_empty() {
        "Someone".to_string()
    } else {
        event.created_by.clone()
    }
}
