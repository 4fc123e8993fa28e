//! Session identifiers.
//!
//! On the wire a session id is a plain integer: the session start time in
//! epoch milliseconds, or `-1` when no session is running.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Wire value written when no session is active.
pub const UNSET_SESSION_ID: i64 = -1;

/// Identifier of the current session window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionId {
    /// No session running (app backgrounded or never opened).
    #[default]
    Unset,
    /// Session started at the given epoch milliseconds.
    Started(i64),
}

impl SessionId {
    pub fn from_millis(ms: i64) -> Self {
        if ms < 0 {
            Self::Unset
        } else {
            Self::Started(ms)
        }
    }

    pub fn as_millis(&self) -> i64 {
        match self {
            Self::Unset => UNSET_SESSION_ID,
            Self::Started(ms) => *ms,
        }
    }

    pub fn started_at(&self) -> Option<i64> {
        match self {
            Self::Unset => None,
            Self::Started(ms) => Some(*ms),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Started(_))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_millis())
    }
}

impl From<SessionId> for serde_json::Value {
    fn from(id: SessionId) -> Self {
        serde_json::Value::from(id.as_millis())
    }
}

impl Serialize for SessionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_millis())
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        i64::deserialize(deserializer).map(Self::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_is_sentinel() {
        assert_eq!(SessionId::Unset.as_millis(), -1);
        assert_eq!(SessionId::from_millis(-1), SessionId::Unset);
        assert!(!SessionId::default().is_active());
    }

    #[test]
    fn test_wire_format_is_integer() {
        let started = SessionId::Started(1_700_000_000_000);
        assert_eq!(
            serde_json::to_value(started).unwrap(),
            serde_json::json!(1_700_000_000_000_i64)
        );
        let parsed: SessionId = serde_json::from_str("-1").unwrap();
        assert_eq!(parsed, SessionId::Unset);
    }
}
