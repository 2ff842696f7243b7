//! Route groups.
//!
//! A group with prefix `P` and shared handlers `[g1..gn]` turns
//! `register(M, S, [h1..hm])` into `register(M, P+S, [g1..gn, h1..hm])`.
//! Nested groups concatenate prefixes and handlers, outer first.

use std::sync::Arc;

use axum::http::Method;

use crate::context::{Context, Handler, HandlerResult};
use crate::routing::{Registrar, Route, RouteError, Router};

/// Registration-time helper sharing a prefix and leading middleware.
pub struct Group<'r> {
    router: &'r mut Router,
    prefix: String,
    handlers: Vec<Handler>,
}

impl<'r> Group<'r> {
    pub(crate) fn new(router: &'r mut Router, prefix: &str) -> Self {
        Self {
            router,
            prefix: prefix.to_string(),
            handlers: Vec::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Append a shared handler; runs before route handlers, in attach order.
    pub fn middleware<F>(self, handler: F) -> Self
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        self.with(Handler::new(handler))
    }

    /// Append a shared handler for routes registered after this call.
    pub fn with(mut self, handler: Handler) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Nested group inheriting this group's prefix and handlers.
    pub fn group(&mut self, prefix: &str) -> Group<'_> {
        Group {
            router: &mut *self.router,
            prefix: format!("{}{}", self.prefix, prefix),
            handlers: self.handlers.clone(),
        }
    }
}

impl Registrar for Group<'_> {
    fn register(&mut self, method: Method, path: &str, handlers: Vec<Handler>) -> Result<Arc<Route>, RouteError> {
        let full_path = format!("{}{}", self.prefix, path);
        if handlers.is_empty() {
            return Err(RouteError::EmptyChain {
                method,
                path: full_path,
            });
        }
        let chain = self.handlers.iter().cloned().chain(handlers).collect();
        self.router.register(method, &full_path, chain)
    }
}
