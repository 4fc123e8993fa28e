//! Normalized analytics events as delivered by the client pipeline.
//!
//! Events are immutable values: annotation returns a new event and leaves the
//! input untouched, so the same event can be handed to several destinations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::properties::{Properties, Traits};

/// A single analytics event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    #[serde(flatten)]
    pub meta: EventMeta,

    #[serde(flatten)]
    pub payload: Payload,
}

/// Attributes shared by every event type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anonymous_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Destination name → opaque options bag.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub integrations: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub context: Map<String, Value>,
}

/// Type-specific event body, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Payload {
    Identify(Identify),
    Track(Track),
    Screen(Screen),
    Group(Group),
    Alias(Alias),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identify {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub traits: Traits,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub event: String,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Screen {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub group_id: String,
    #[serde(default)]
    pub traits: Option<Traits>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alias {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub previous_id: Option<String>,
}

/// Event discriminant, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Identify,
    Track,
    Screen,
    Group,
    Alias,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventType::Identify => "identify",
            EventType::Track => "track",
            EventType::Screen => "screen",
            EventType::Group => "group",
            EventType::Alias => "alias",
        };
        f.write_str(s)
    }
}

impl AnalyticsEvent {
    pub fn new(payload: Payload) -> Self {
        Self {
            meta: EventMeta::default(),
            payload,
        }
    }

    pub fn identify(user_id: Option<&str>, traits: Traits) -> Self {
        Self::new(Payload::Identify(Identify {
            user_id: user_id.map(str::to_string),
            traits,
        }))
    }

    pub fn track(event: impl Into<String>, properties: Properties) -> Self {
        Self::new(Payload::Track(Track {
            event: event.into(),
            properties,
        }))
    }

    pub fn screen(name: Option<&str>, category: Option<&str>, properties: Properties) -> Self {
        Self::new(Payload::Screen(Screen {
            name: name.map(str::to_string),
            category: category.map(str::to_string),
            properties,
        }))
    }

    pub fn group(group_id: impl Into<String>, traits: Option<Traits>) -> Self {
        Self::new(Payload::Group(Group {
            group_id: group_id.into(),
            traits,
        }))
    }

    pub fn alias(user_id: Option<&str>, previous_id: Option<&str>) -> Self {
        Self::new(Payload::Alias(Alias {
            user_id: user_id.map(str::to_string),
            previous_id: previous_id.map(str::to_string),
        }))
    }

    /// Builder-style: replace the options bag for one destination.
    pub fn with_integration(mut self, destination: impl Into<String>, options: Value) -> Self {
        self.meta.integrations.insert(destination.into(), options);
        self
    }

    /// Builder-style: set the event timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.meta.timestamp = Some(timestamp);
        self
    }

    pub fn event_type(&self) -> EventType {
        match &self.payload {
            Payload::Identify(_) => EventType::Identify,
            Payload::Track(_) => EventType::Track,
            Payload::Screen(_) => EventType::Screen,
            Payload::Group(_) => EventType::Group,
            Payload::Alias(_) => EventType::Alias,
        }
    }

    /// Options bag for a destination, when it is a JSON object.
    ///
    /// `"Amplitude": true` (a plain enable flag) yields `None`.
    pub fn integration_options(&self, destination: &str) -> Option<&Map<String, Value>> {
        self.meta.integrations.get(destination)?.as_object()
    }

    /// Copy of this event with `integrations[destination][key] = value`.
    ///
    /// Other keys already present in the destination bag are kept; a
    /// non-object bag is replaced.
    pub fn with_integration_option(&self, destination: &str, key: &str, value: Value) -> Self {
        let mut annotated = self.clone();
        let slot = annotated
            .meta
            .integrations
            .entry(destination.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        if let Value::Object(bag) = slot {
            bag.insert(key.to_string(), value);
        }
        annotated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_tagged_event() {
        let event: AnalyticsEvent = serde_json::from_value(json!({
            "type": "track",
            "messageId": "m-1",
            "event": "Order Completed",
            "properties": {"revenue": 20},
            "integrations": {"Amplitude": {"outOfSession": true}},
        }))
        .unwrap();

        assert_eq!(event.event_type(), EventType::Track);
        assert_eq!(event.meta.message_id.as_deref(), Some("m-1"));
        match &event.payload {
            Payload::Track(track) => {
                assert_eq!(track.event, "Order Completed");
                assert!(track.properties.contains_key("revenue"));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
        assert!(event.integration_options("Amplitude").is_some());
    }

    #[test]
    fn test_deserialize_identify_and_group() {
        let identify: AnalyticsEvent = serde_json::from_value(json!({
            "type": "identify",
            "userId": "u-1",
            "traits": {"age": 20},
        }))
        .unwrap();
        assert_eq!(identify.event_type(), EventType::Identify);

        let group: AnalyticsEvent = serde_json::from_value(json!({
            "type": "group",
            "groupId": "g-1",
        }))
        .unwrap();
        assert_eq!(group, AnalyticsEvent::group("g-1", None));
    }

    #[test]
    fn test_annotation_is_copy_on_write() {
        let original = AnalyticsEvent::track("foo", Properties::new())
            .with_integration("Actions Amplitude", json!({"keep": 1}));
        let annotated =
            original.with_integration_option("Actions Amplitude", "session_id", json!(5));

        assert_eq!(
            original.integration_options("Actions Amplitude").unwrap().get("session_id"),
            None
        );
        let bag = annotated.integration_options("Actions Amplitude").unwrap();
        assert_eq!(bag.get("session_id"), Some(&json!(5)));
        assert_eq!(bag.get("keep"), Some(&json!(1)));
    }

    #[test]
    fn test_annotation_replaces_flag_bag() {
        let original = AnalyticsEvent::alias(Some("new"), Some("old"))
            .with_integration("Actions Amplitude", json!(true));
        let annotated =
            original.with_integration_option("Actions Amplitude", "session_id", json!(-1));
        assert_eq!(
            annotated.meta.integrations["Actions Amplitude"],
            json!({"session_id": -1})
        );
    }

    #[test]
    fn test_flag_bag_has_no_options() {
        let event = AnalyticsEvent::track("foo", Properties::new())
            .with_integration("Amplitude", json!(true));
        assert!(event.integration_options("Amplitude").is_none());
        assert!(event.integration_options("Mixpanel").is_none());
    }
}
