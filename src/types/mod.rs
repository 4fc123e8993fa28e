//! Core types for the relay.
//!
//! This module provides foundational types used throughout the system:
//! - **IDs**: Session identifiers with their `-1` wire sentinel
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Integration settings, session window and observability config

mod config;
mod errors;
mod ids;

pub use config::{Config, IntegrationSettings, ObservabilityConfig, SessionConfig};
pub use errors::{Error, Result};
pub use ids::{SessionId, UNSET_SESSION_ID};
