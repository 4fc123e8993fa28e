//! Configuration structures.
//!
//! The integration settings arrive as the flat key→value bag configured on the
//! destination (camelCase keys). Everything else is relay-level config with
//! sensible defaults.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use super::errors::{Error, Result};

/// Global relay configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Destination settings bag.
    #[serde(default)]
    pub integration: IntegrationSettings,

    /// Session window configuration.
    #[serde(default)]
    pub session: SessionConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Parse a full configuration document.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::config(format!("invalid config: {e}")))
    }
}

/// Per-destination translation settings. Immutable once a translator is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IntegrationSettings {
    /// Log every screen as `Viewed {name} Screen`.
    pub track_all_pages: bool,

    /// Log screens that carry a category.
    pub track_categorized_pages: bool,

    /// Log screens that carry a name.
    pub track_named_pages: bool,

    /// Log every screen as a single `Loaded a Screen` event. Takes priority
    /// over the three flags above.
    pub track_all_pages_v2: bool,

    /// Report revenue through the structured v2 call instead of the legacy one.
    pub use_log_revenue_v2: bool,

    /// Group trait holding the group type (label).
    #[serde(deserialize_with = "empty_as_none")]
    pub group_type_trait: Option<String>,

    /// Group trait holding the group value.
    #[serde(deserialize_with = "empty_as_none")]
    pub group_value_trait: Option<String>,

    /// Identify traits sent as increment operations.
    #[serde(deserialize_with = "string_set")]
    pub traits_to_increment: BTreeSet<String>,

    /// Identify traits sent as set-once operations.
    #[serde(deserialize_with = "string_set")]
    pub traits_to_set_once: BTreeSet<String>,
}

impl Default for IntegrationSettings {
    fn default() -> Self {
        Self {
            track_all_pages: false,
            track_categorized_pages: false,
            track_named_pages: false,
            track_all_pages_v2: true,
            use_log_revenue_v2: false,
            group_type_trait: None,
            group_value_trait: None,
            traits_to_increment: BTreeSet::new(),
            traits_to_set_once: BTreeSet::new(),
        }
    }
}

impl IntegrationSettings {
    /// Read the destination settings bag. Unknown keys (apiKey, etc.) are ignored.
    pub fn from_settings(settings: &serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        serde_json::from_value(serde_json::Value::Object(settings.clone()))
            .map_err(|e| Error::config(format!("invalid integration settings: {e}")))
    }
}

/// Session window configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle time after which the next event starts a new session.
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(300),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

// Dashboards send "" for an unset trait name.
fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()))
}

fn string_set<'de, D>(deserializer: D) -> std::result::Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<String>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect())
}
