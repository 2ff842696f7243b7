//! Router lifecycle events.
//!
//! # Responsibilities
//! - Describe events the router emits during dispatch
//! - Deliver them to an optional observer
//!
//! # Design Decisions
//! - Fire-and-forget: observer failures never abort a request
//! - Payloads borrow the live context; listeners cannot keep them

use std::collections::HashMap;

use crate::context::Context;
use crate::routing::Route;

/// Emitted after a route matched, before the chain starts.
pub const ROUTER_MATCH: &str = "router.match";

/// An event emitted by the router.
#[derive(Debug)]
pub enum Event<'a> {
    RouteMatched {
        context: &'a Context,
        route: &'a Route,
    },
}

impl Event<'_> {
    /// Name listeners subscribe to, e.g. `router.match`.
    pub fn name(&self) -> &'static str {
        match self {
            Event::RouteMatched { .. } => ROUTER_MATCH,
        }
    }
}

/// Listener failure, reported back to the router for logging only.
#[derive(Debug, thiserror::Error)]
#[error("event listener failed: {0}")]
pub struct EventError(pub String);

/// Receives router events.
pub trait EventObserver: Send + Sync {
    fn dispatch(&self, event: &Event<'_>) -> Result<(), EventError>;
}

type Listener = Box<dyn Fn(&Event<'_>) -> Result<(), EventError> + Send + Sync>;

/// Observer that fans events out to listeners registered by name.
#[derive(Default)]
pub struct EventBus {
    listeners: HashMap<&'static str, Vec<Listener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `listener` to events named `name`.
    pub fn listen<F>(&mut self, name: &'static str, listener: F) -> &mut Self
    where
        F: Fn(&Event<'_>) -> Result<(), EventError> + Send + Sync + 'static,
    {
        self.listeners.entry(name).or_default().push(Box::new(listener));
        self
    }
}

impl EventObserver for EventBus {
    /// Runs every listener; the first failure is returned after all ran.
    fn dispatch(&self, event: &Event<'_>) -> Result<(), EventError> {
        let mut first_error = None;
        for listener in self.listeners.get(event.name()).into_iter().flatten() {
            if let Err(err) = listener(event) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
