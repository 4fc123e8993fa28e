//! Event model and translation to vendor calls.
//!
//! - **payload**: the tagged `AnalyticsEvent` union and its builders
//! - **properties**: ordered `Properties` / `Traits` maps, typed revenue view
//! - **options**: per-destination options (`groups`, `outOfSession`)
//! - **translation**: `EventTranslator`, event → vendor calls

pub mod options;
pub mod payload;
pub mod properties;
pub mod translation;

pub use options::{extract_groups, out_of_session, Groups};
pub use payload::{
    Alias, AnalyticsEvent, EventMeta, EventType, Group, Identify, Payload, Screen, Track,
};
pub use properties::{Properties, RevenueFields, Traits};
pub use translation::{EventTranslator, AMPLITUDE_KEY, DEFAULT_GROUP_LABEL};
