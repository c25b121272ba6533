use crate::core::{EventTag, SLACK_TAG_TYPE};

/// Returns the channel names an event's tags point at, in tag order.
///
/// An empty result means nobody is watching this event on Slack.
pub fn tagged_channels(tags: &[EventTag]) -> Vec<String> {
    tags.iter()
        .filter(|tag| tag.tag_type == SLACK_TAG_TYPE)
        .map(|tag| tag.value.clone())
        .collect()
}
