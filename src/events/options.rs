//! Destination options read from `integrations[<destination>]`.
//!
//! Bags are untyped client input. Anything that does not decode is logged and
//! omitted; it never fails the event.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::payload::AnalyticsEvent;
use crate::types::{Error, Result};

const GROUPS_KEY: &str = "groups";
const OUT_OF_SESSION_KEY: &str = "outOfSession";

/// Group type → group value(s), in the order the client sent them.
///
/// Values are scalars (string, number, bool) or lists of scalars.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Groups(Map<String, Value>);

impl Groups {
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn get(&self, group_type: &str) -> Option<&Value> {
        self.0.get(group_type)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Groups> for Value {
    fn from(groups: Groups) -> Self {
        Value::Object(groups.0)
    }
}

/// Read `integrations[destination].groups`.
///
/// `None` when the destination has no options bag or the bag has no `groups`
/// entry. Entries whose value is not a scalar or list of scalars are skipped.
pub fn extract_groups(event: &AnalyticsEvent, destination: &str) -> Option<Groups> {
    let raw = event.integration_options(destination)?.get(GROUPS_KEY)?;
    let Some(entries) = raw.as_object() else {
        tracing::warn!(destination, value = %raw, "ignoring groups option: not an object");
        return None;
    };

    let mut groups = Map::new();
    for (group_type, value) in entries {
        match decode_group_value(group_type, value) {
            Ok(value) => {
                groups.insert(group_type.clone(), value);
            }
            Err(err) => {
                tracing::warn!(
                    destination,
                    group_type = %group_type,
                    error = %err,
                    "skipping group entry"
                );
            }
        }
    }
    Some(Groups(groups))
}

/// `true` only when `integrations[destination].outOfSession` is the JSON
/// boolean `true`. The string `"true"` does not count.
pub fn out_of_session(event: &AnalyticsEvent, destination: &str) -> bool {
    event
        .integration_options(destination)
        .and_then(|bag| bag.get(OUT_OF_SESSION_KEY))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn decode_group_value(group_type: &str, value: &Value) -> Result<Value> {
    match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => Ok(value.clone()),
        Value::Array(items) => {
            if let Some(bad) = items.iter().find(|item| !is_scalar(item)) {
                return Err(Error::decode(format!(
                    "groups.{group_type} contains a non-scalar value: {bad}"
                )));
            }
            Ok(value.clone())
        }
        Value::Null | Value::Object(_) => Err(Error::decode(format!(
            "groups.{group_type} must be a scalar or list, got {value}"
        ))),
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Properties;
    use serde_json::json;
    use tracing_test::traced_test;

    fn track_with(destination: &str, options: Value) -> AnalyticsEvent {
        AnalyticsEvent::track("foo", Properties::new()).with_integration(destination, options)
    }

    #[test]
    fn test_groups_absent() {
        let bare = AnalyticsEvent::track("foo", Properties::new());
        assert!(extract_groups(&bare, "Amplitude").is_none());

        let other = track_with("Mixpanel", json!({"groups": "foo"}));
        assert!(extract_groups(&other, "Amplitude").is_none());

        let flag = track_with("Amplitude", json!(true));
        assert!(extract_groups(&flag, "Amplitude").is_none());

        let empty = track_with("Amplitude", json!({}));
        assert!(extract_groups(&empty, "Amplitude").is_none());

        let unrelated = track_with("Amplitude", json!({"foo": "bar"}));
        assert!(extract_groups(&unrelated, "Amplitude").is_none());
    }

    #[test]
    fn test_scalar_groups() {
        let event = track_with("Amplitude", json!({"groups": {"foo": "bar"}}));
        let groups = extract_groups(&event, "Amplitude").unwrap();
        assert_eq!(Value::from(groups), json!({"foo": "bar"}));
    }

    #[test]
    fn test_list_groups() {
        let event = track_with(
            "Amplitude",
            json!({"groups": {"sports": ["basketball", "tennis"]}}),
        );
        let groups = extract_groups(&event, "Amplitude").unwrap();
        assert_eq!(groups.get("sports"), Some(&json!(["basketball", "tennis"])));
    }

    #[test]
    #[traced_test]
    fn test_undecodable_entries_skipped_and_logged() {
        let event = track_with(
            "Amplitude",
            json!({"groups": {
                "nested": {"a": 1},
                "org": "acme",
                "mixed": ["a", {"b": 2}],
                "none": null,
            }}),
        );
        let groups = extract_groups(&event, "Amplitude").unwrap();

        assert_eq!(Value::from(groups), json!({"org": "acme"}));
        assert!(logs_contain("skipping group entry"));
    }

    #[test]
    #[traced_test]
    fn test_non_object_groups_logged() {
        let event = track_with("Amplitude", json!({"groups": "foo"}));
        assert!(extract_groups(&event, "Amplitude").is_none());
        assert!(logs_contain("not an object"));
    }

    #[test]
    fn test_out_of_session_exact_boolean() {
        assert!(out_of_session(
            &track_with("Amplitude", json!({"outOfSession": true})),
            "Amplitude"
        ));
        assert!(!out_of_session(
            &track_with("Amplitude", json!({"outOfSession": "true"})),
            "Amplitude"
        ));
        assert!(!out_of_session(
            &track_with("Amplitude", json!({"outOfSession": 1})),
            "Amplitude"
        ));
        assert!(!out_of_session(
            &track_with("Amplitude", json!({"outOfSession": false})),
            "Amplitude"
        ));
        assert!(!out_of_session(
            &AnalyticsEvent::track("foo", Properties::new()),
            "Amplitude"
        ));
    }
}
