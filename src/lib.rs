//! # Amplitude Relay - Analytics Event Adapter
//!
//! Forwards normalized analytics events (identify, track, screen, group, alias)
//! to the Amplitude client API:
//! - Event translation into vendor calls, including the revenue sub-protocol
//! - Session-id windowing middleware with an idle timeout
//! - Middleware chain with destination fan-out
//!
//! ## Architecture
//!
//! Events pass through the middleware chain to completion, then fan out:
//! ```text
//!                 ┌───────────────────┐      ┌──────────────────┐
//!   event   →     │ SessionCorrelator │  →   │ EventTranslator  │ → VendorClient
//!                 │  (stamps session) │  ├─→ │   (Amplitude)    │
//!                 └───────────────────┘  │   └──────────────────┘
//!                                        └─→  other destinations
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

// Re-export public API
pub mod events;
pub mod pipeline;
pub mod session;
pub mod types;
pub mod vendor;

// Internal utilities
pub mod observability;

pub use events::{AnalyticsEvent, EventTranslator, Properties, Traits};
pub use pipeline::{Destination, Middleware, Next, Pipeline};
pub use session::SessionCorrelator;
pub use types::{Config, Error, IntegrationSettings, Result, SessionId};
pub use vendor::{RecordingClient, VendorCall, VendorClient};
