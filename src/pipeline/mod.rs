//! Middleware chain and destination fan-out.
//!
//! Events flow through every middleware in order, each of which must forward
//! exactly one event to [`Next::proceed`]. The resolved event is then handed
//! to every destination. Middleware always runs to completion before
//! fan-out, so all destinations observe the same annotations.

use std::fmt;

use crate::events::translation::{EventTranslator, AMPLITUDE_KEY};
use crate::events::AnalyticsEvent;
use crate::types::Result;
use crate::vendor::VendorClient;

/// A pipeline stage that may annotate events before delivery.
pub trait Middleware {
    /// Inspect `event` and forward it (or a transformed copy) through `next`.
    fn intercept(&mut self, event: AnalyticsEvent, next: Next<'_>) -> Result<()>;
}

/// A sink receiving fully-resolved events.
pub trait Destination {
    /// Destination name, as used in `integrations`.
    fn key(&self) -> &str;

    fn deliver(&mut self, event: &AnalyticsEvent) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        Ok(())
    }
}

type Sink<'a> = dyn FnMut(AnalyticsEvent) -> Result<()> + 'a;

/// Remainder of the middleware chain.
///
/// Consumed by [`Next::proceed`], so a stage cannot forward twice.
#[must_use = "middleware must forward the event with `Next::proceed`"]
pub struct Next<'a> {
    rest: &'a mut [Box<dyn Middleware>],
    sink: &'a mut Sink<'a>,
}

impl<'a> Next<'a> {
    pub fn new(rest: &'a mut [Box<dyn Middleware>], sink: &'a mut Sink<'a>) -> Self {
        Self { rest, sink }
    }

    /// Hand `event` to the next stage, or to the sink at the end of the chain.
    pub fn proceed(self, event: AnalyticsEvent) -> Result<()> {
        let Next { rest, sink } = self;
        match rest.split_first_mut() {
            Some((stage, tail)) => stage.intercept(event, Next { rest: tail, sink }),
            None => sink(event),
        }
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining_stages", &self.rest.len())
            .finish()
    }
}

impl<C: VendorClient> Destination for EventTranslator<C> {
    fn key(&self) -> &str {
        AMPLITUDE_KEY
    }

    fn deliver(&mut self, event: &AnalyticsEvent) -> Result<()> {
        self.handle(event).map(|_| ())
    }

    fn flush(&mut self) -> Result<()> {
        EventTranslator::flush(self)
    }

    fn reset(&mut self) -> Result<()> {
        EventTranslator::reset(self)
    }
}

/// Ordered middleware plus the destinations events fan out to.
#[derive(Default)]
pub struct Pipeline {
    middleware: Vec<Box<dyn Middleware>>,
    destinations: Vec<Box<dyn Destination>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_middleware(mut self, stage: impl Middleware + 'static) -> Self {
        self.middleware.push(Box::new(stage));
        self
    }

    pub fn with_destination(mut self, destination: impl Destination + 'static) -> Self {
        self.destinations.push(Box::new(destination));
        self
    }

    /// Run `event` through the chain and deliver the result to every destination.
    ///
    /// Returns the number of destinations reached; `0` when a stage dropped
    /// the event. The first destination error aborts delivery.
    pub fn process(&mut self, event: AnalyticsEvent) -> Result<usize> {
        let mut resolved = None;
        {
            let mut sink = |annotated: AnalyticsEvent| {
                resolved = Some(annotated);
                Ok(())
            };
            Next::new(&mut self.middleware, &mut sink).proceed(event)?;
        }

        let Some(event) = resolved else {
            tracing::warn!("middleware dropped event before delivery");
            return Ok(0);
        };

        for destination in &mut self.destinations {
            destination.deliver(&event)?;
            tracing::trace!(
                destination = destination.key(),
                event_type = %event.event_type(),
                "event delivered"
            );
        }
        Ok(self.destinations.len())
    }

    pub fn flush(&mut self) -> Result<()> {
        for destination in &mut self.destinations {
            destination.flush()?;
        }
        Ok(())
    }

    pub fn reset(&mut self) -> Result<()> {
        for destination in &mut self.destinations {
            destination.reset()?;
        }
        Ok(())
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.destinations.iter().map(|d| d.key()).collect();
        f.debug_struct("Pipeline")
            .field("middleware", &self.middleware.len())
            .field("destinations", &keys)
            .finish()
    }
}
