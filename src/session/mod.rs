//! Session-id windowing middleware.
//!
//! Stamps every event with `integrations["Actions Amplitude"].session_id`.
//! A session starts on "Application Opened", ends on "Application
//! Backgrounded", and rolls forward lazily when an event arrives after the
//! idle window has elapsed. There is no background timer: the idle check runs
//! when the id is read.

mod clock;

use std::time::Duration;

use crate::events::{AnalyticsEvent, Payload};
use crate::pipeline::{Middleware, Next};
use crate::types::{Result, SessionConfig, SessionId};

pub use clock::{Clock, ManualClock, SystemClock};

/// Destination key the session id is written under.
pub const SESSION_KEY: &str = "Actions Amplitude";

/// Field inside the destination bag holding the session id.
pub const SESSION_ID_FIELD: &str = "session_id";

pub const APPLICATION_OPENED: &str = "Application Opened";
pub const APPLICATION_BACKGROUNDED: &str = "Application Backgrounded";

/// Default idle window (5 minutes).
pub const DEFAULT_IDLE_WINDOW: Duration = Duration::from_millis(300_000);

/// Middleware owning the current session window.
///
/// One instance per analytics client. Runs on the single pipeline worker, so
/// the state is plain `&mut self`.
#[derive(Debug)]
pub struct SessionCorrelator<K = SystemClock> {
    clock: K,
    idle_window_ms: i64,
    session_id: SessionId,
}

impl SessionCorrelator<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for SessionCorrelator<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clock> SessionCorrelator<K> {
    pub fn with_clock(clock: K) -> Self {
        Self {
            clock,
            idle_window_ms: duration_millis(DEFAULT_IDLE_WINDOW),
            session_id: SessionId::Unset,
        }
    }

    pub fn from_config(config: &SessionConfig, clock: K) -> Self {
        Self::with_clock(clock).idle_window(config.idle_timeout)
    }

    /// Builder-style: override the idle window.
    pub fn idle_window(mut self, window: Duration) -> Self {
        self.idle_window_ms = duration_millis(window);
        self
    }

    /// Current session id, rolled forward when the idle window has elapsed.
    ///
    /// Never starts a session: an inactive correlator stays `Unset`.
    pub fn session_id(&mut self) -> SessionId {
        if let SessionId::Started(started) = self.session_id {
            let now = self.clock.now_millis();
            if now.saturating_sub(started) >= self.idle_window_ms {
                tracing::debug!(previous = started, next = now, "session idle window elapsed");
                self.session_id = SessionId::Started(now);
            }
        }
        self.session_id
    }

    pub fn start_session(&mut self) {
        let now = self.clock.now_millis();
        self.session_id = SessionId::Started(now);
        tracing::debug!(session_id = now, "session started");
    }

    pub fn end_session(&mut self) {
        if self.session_id.is_active() {
            tracing::debug!(session_id = %self.session_id, "session ended");
        }
        self.session_id = SessionId::Unset;
    }

    /// Apply lifecycle transitions for `event` and return a stamped copy.
    pub fn stamp(&mut self, event: &AnalyticsEvent) -> AnalyticsEvent {
        if let Payload::Track(track) = &event.payload {
            match track.event.as_str() {
                APPLICATION_BACKGROUNDED => self.end_session(),
                APPLICATION_OPENED => self.start_session(),
                _ => {}
            }
        }
        let session_id = self.session_id();
        event.with_integration_option(SESSION_KEY, SESSION_ID_FIELD, session_id.into())
    }
}

impl<K: Clock> Middleware for SessionCorrelator<K> {
    fn intercept(&mut self, event: AnalyticsEvent, next: Next<'_>) -> Result<()> {
        let stamped = self.stamp(&event);
        next.proceed(stamped)
    }
}

/// Session id an event was stamped with, if any.
pub fn stamped_session_id(event: &AnalyticsEvent) -> Option<SessionId> {
    event
        .integration_options(SESSION_KEY)?
        .get(SESSION_ID_FIELD)?
        .as_i64()
        .map(SessionId::from_millis)
}

fn duration_millis(window: Duration) -> i64 {
    i64::try_from(window.as_millis()).unwrap_or(i64::MAX)
}
