//! Event translation — analytics events → Amplitude client calls.
//!
//! Pure deterministic mapping from an event (plus immutable settings) to a list
//! of [`VendorCall`]s, which [`EventTranslator::handle`] then dispatches.
//!
//! Translation rules:
//!   identify → setUserId, setUserProperties, [identify ops], setGroup per option group
//!   track    → logEvent, then logRevenue / logRevenueV2 when revenue or total is present
//!   screen   → one of: "Loaded a Screen" | "Viewed {name} Screen" | nothing
//!   group    → setGroup(label, value)
//!   alias    → (nothing)

use serde_json::Value;

use super::options::{extract_groups, out_of_session};
use super::payload::{AnalyticsEvent, Group, Identify, Payload, Screen, Track};
use super::properties::{Properties, RevenueFields, Traits};
use crate::types::{IntegrationSettings, Result};
use crate::vendor::{IdentifyOperation, Receipt, Revenue, VendorCall, VendorClient};

/// Destination key under which events carry Amplitude options.
pub const AMPLITUDE_KEY: &str = "Amplitude";

/// Group label used when neither settings nor traits provide one.
pub const DEFAULT_GROUP_LABEL: &str = "[Segment] Group";

const LOADED_SCREEN_EVENT: &str = "Loaded a Screen";
const UNLABELED_SCREEN_EVENT: &str = "Viewed Screen";

/// Translates events into vendor calls and issues them on the injected client.
///
/// Holds no mutable state: translating the same event twice yields the same
/// calls.
#[derive(Debug)]
pub struct EventTranslator<C> {
    settings: IntegrationSettings,
    client: C,
}

impl<C> EventTranslator<C> {
    pub fn new(settings: IntegrationSettings, client: C) -> Self {
        Self { settings, client }
    }

    pub fn settings(&self) -> &IntegrationSettings {
        &self.settings
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Plan the vendor calls for an event without issuing them.
    pub fn translate(&self, event: &AnalyticsEvent) -> Vec<VendorCall> {
        let mut calls = Vec::new();
        match &event.payload {
            Payload::Identify(identify) => self.translate_identify(event, identify, &mut calls),
            Payload::Track(track) => self.translate_track(event, track, &mut calls),
            Payload::Screen(screen) => self.translate_screen(screen, &mut calls),
            Payload::Group(group) => calls.push(self.translate_group(group)),
            // Aliasing is left to the transport.
            Payload::Alias(_) => {}
        }
        calls
    }

    fn translate_identify(
        &self,
        event: &AnalyticsEvent,
        identify: &Identify,
        calls: &mut Vec<VendorCall>,
    ) {
        if let Some(user_id) = &identify.user_id {
            calls.push(VendorCall::SetUserId {
                user_id: Some(user_id.clone()),
            });
        }

        let mut user_properties = Traits::new();
        let mut operations = Vec::new();
        for (key, value) in identify.traits.iter() {
            if self.settings.traits_to_increment.contains(key) {
                operations.push(IdentifyOperation::Add {
                    property: key.clone(),
                    value: value.clone(),
                });
            } else if self.settings.traits_to_set_once.contains(key) {
                operations.push(IdentifyOperation::SetOnce {
                    property: key.clone(),
                    value: value.clone(),
                });
            } else {
                user_properties.insert(key.clone(), value.clone());
            }
        }

        calls.push(VendorCall::SetUserProperties {
            properties: user_properties,
        });
        if !operations.is_empty() {
            calls.push(VendorCall::ApplyIdentifyOperations { operations });
        }

        if let Some(groups) = extract_groups(event, AMPLITUDE_KEY) {
            for (group_type, group_name) in groups.iter() {
                calls.push(VendorCall::SetGroup {
                    group_type: group_type.clone(),
                    group_name: group_name.clone(),
                });
            }
        }
    }

    fn translate_track(&self, event: &AnalyticsEvent, track: &Track, calls: &mut Vec<VendorCall>) {
        calls.push(VendorCall::LogEvent {
            name: track.event.clone(),
            properties: track.properties.clone(),
            groups: extract_groups(event, AMPLITUDE_KEY),
            out_of_session: out_of_session(event, AMPLITUDE_KEY),
        });

        let Some(fields) = track.properties.revenue_fields() else {
            return;
        };

        calls.push(if self.settings.use_log_revenue_v2 {
            VendorCall::LogRevenueV2 {
                revenue: revenue_record(fields, &track.properties),
            }
        } else {
            VendorCall::LogRevenue {
                product_id: fields.product_id,
                quantity: fields.quantity.unwrap_or(0),
                amount: fields.amount,
                receipt: fields.receipt,
                receipt_signature: fields.receipt_signature,
            }
        });
    }

    fn translate_screen(&self, screen: &Screen, calls: &mut Vec<VendorCall>) {
        let name = non_empty(&screen.name);
        let category = non_empty(&screen.category);

        let (event_name, properties) = if self.settings.track_all_pages_v2 {
            let mut properties = screen.properties.clone();
            if let Some(name) = name {
                properties.insert("name", name);
            }
            (LOADED_SCREEN_EVENT.to_string(), properties)
        } else if self.settings.track_all_pages {
            let event_name = match name.or(category) {
                Some(label) => viewed_screen(label),
                None => UNLABELED_SCREEN_EVENT.to_string(),
            };
            (event_name, screen.properties.clone())
        } else if let (true, Some(category)) = (self.settings.track_categorized_pages, category) {
            (viewed_screen(category), screen.properties.clone())
        } else if let (true, Some(name)) = (self.settings.track_named_pages, name) {
            (viewed_screen(name), screen.properties.clone())
        } else {
            return;
        };

        calls.push(VendorCall::LogEvent {
            name: event_name,
            properties,
            groups: None,
            out_of_session: false,
        });
    }

    fn translate_group(&self, group: &Group) -> VendorCall {
        let traits = group.traits.as_ref();
        let trait_value = |configured: &Option<String>| {
            configured
                .as_deref()
                .and_then(|key| traits.and_then(|t| t.get_string(key)))
        };

        let label = trait_value(&self.settings.group_type_trait)
            .or_else(|| traits.and_then(Traits::name))
            .unwrap_or_else(|| DEFAULT_GROUP_LABEL.to_string());
        let value = trait_value(&self.settings.group_value_trait)
            .unwrap_or_else(|| group.group_id.clone());

        VendorCall::SetGroup {
            group_type: label,
            group_name: Value::String(value),
        }
    }
}

impl<C: VendorClient> EventTranslator<C> {
    /// Translate an event and issue the resulting calls in order.
    ///
    /// A vendor error aborts the remaining calls for this event and is
    /// returned as-is.
    pub fn handle(&self, event: &AnalyticsEvent) -> Result<Vec<VendorCall>> {
        let calls = self.translate(event);
        if calls.is_empty() {
            tracing::debug!(event_type = %event.event_type(), "no vendor calls for event");
        }
        for call in &calls {
            call.dispatch(&self.client)?;
            tracing::debug!(
                call = call.name(),
                event_type = %event.event_type(),
                "vendor call issued"
            );
        }
        Ok(calls)
    }

    /// Flush the client's buffered events.
    pub fn flush(&self) -> Result<()> {
        VendorCall::UploadEvents.dispatch(&self.client)?;
        tracing::debug!("vendor events uploaded");
        Ok(())
    }

    /// Forget the current user: clear the user id and regenerate the device id.
    pub fn reset(&self) -> Result<()> {
        VendorCall::SetUserId { user_id: None }.dispatch(&self.client)?;
        VendorCall::RegenerateDeviceId.dispatch(&self.client)?;
        tracing::debug!("vendor identity reset");
        Ok(())
    }
}

/// Resolve price and quantity for the v2 revenue call.
///
/// With an explicit price, quantity defaults to 1. Without one, the amount is
/// one unit at that price and any supplied quantity is ignored.
fn revenue_record(fields: RevenueFields, properties: &Properties) -> Revenue {
    let (price, quantity) = match fields.price {
        Some(price) => (price, fields.quantity.unwrap_or(1)),
        None => (fields.amount, 1),
    };
    let receipt = match (fields.receipt, fields.receipt_signature) {
        (Some(receipt), Some(signature)) => Some(Receipt { receipt, signature }),
        _ => None,
    };

    Revenue {
        price,
        quantity,
        product_id: fields.product_id,
        revenue_type: fields.revenue_type,
        receipt,
        event_properties: properties.clone(),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn viewed_screen(label: &str) -> String {
    format!("Viewed {label} Screen")
}
