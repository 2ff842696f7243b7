//! Registered routes and the registration surface.

use std::sync::Arc;

use axum::http::Method;

use crate::context::{Context, Handler, HandlerResult};
use crate::routing::RouteError;

/// A registered route: method, pattern and its handler chain.
///
/// Immutable once registered; the last handler is the terminal one.
#[derive(Debug)]
pub struct Route {
    method: Method,
    path: String,
    handlers: Arc<[Handler]>,
}

impl Route {
    pub(crate) fn new(method: Method, path: String, handlers: Vec<Handler>) -> Self {
        Self {
            method,
            path,
            handlers: handlers.into(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The pattern this route was registered under.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Full chain, group handlers first.
    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }

    pub(crate) fn chain(&self) -> Arc<[Handler]> {
        Arc::clone(&self.handlers)
    }
}

/// Anything routes can be registered on: the router itself or a group.
pub trait Registrar {
    /// Register a full handler chain for `method` and `path`.
    fn register(&mut self, method: Method, path: &str, handlers: Vec<Handler>) -> Result<Arc<Route>, RouteError>;

    fn handle<F>(&mut self, method: Method, path: &str, handler: F) -> Result<Arc<Route>, RouteError>
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(method, path, vec![Handler::new(handler)])
    }

    fn get<F>(&mut self, path: &str, handler: F) -> Result<Arc<Route>, RouteError>
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        self.handle(Method::GET, path, handler)
    }

    fn post<F>(&mut self, path: &str, handler: F) -> Result<Arc<Route>, RouteError>
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        self.handle(Method::POST, path, handler)
    }

    fn put<F>(&mut self, path: &str, handler: F) -> Result<Arc<Route>, RouteError>
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        self.handle(Method::PUT, path, handler)
    }

    fn patch<F>(&mut self, path: &str, handler: F) -> Result<Arc<Route>, RouteError>
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        self.handle(Method::PATCH, path, handler)
    }

    fn delete<F>(&mut self, path: &str, handler: F) -> Result<Arc<Route>, RouteError>
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        self.handle(Method::DELETE, path, handler)
    }

    fn options<F>(&mut self, path: &str, handler: F) -> Result<Arc<Route>, RouteError>
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        self.handle(Method::OPTIONS, path, handler)
    }
}
