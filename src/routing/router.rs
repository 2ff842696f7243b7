//! Route table and request dispatch.
//!
//! # Responsibilities
//! - Store routes keyed by (method, pattern), rejecting duplicates
//! - Resolve requests through the path matcher
//! - Build the per-request context and start the handler chain
//! - Fall back to the not-found chain, 405, or a bare 404
//! - Answer `OPTIONS` on a known path with 200 and `Allow` unless an
//!   `OPTIONS` route is registered
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Registration errors surface at startup, never at request time
//! - Handler errors are not caught here; recovery is a middleware concern
//! - Observer failures are logged and ignored

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::response::Response;

use crate::context::{Context, Handler, HandlerResult, Params};
use crate::events::{Event, EventObserver};
use crate::http::error::HttpError;
use crate::http::static_files::StaticFiles;
use crate::routing::matcher::{PathMatcher, RouteId, SegmentTrie};
use crate::routing::{Group, Registrar, Route, RouteError};
use crate::services::Services;

/// Maps (method, path) to handler chains and runs them.
pub struct Router {
    services: Arc<Services>,
    matcher: Box<dyn PathMatcher>,
    routes: Vec<Arc<Route>>,
    keys: HashMap<(Method, String), RouteId>,
    not_found: Option<Arc<[Handler]>>,
    observer: Option<Arc<dyn EventObserver>>,
}

impl Router {
    pub fn new(services: Arc<Services>) -> Self {
        Self::with_matcher(services, Box::new(SegmentTrie::new()))
    }

    /// Router backed by a custom [`PathMatcher`].
    pub fn with_matcher(services: Arc<Services>, matcher: Box<dyn PathMatcher>) -> Self {
        Self {
            services,
            matcher,
            routes: Vec::new(),
            keys: HashMap::new(),
            not_found: None,
            observer: None,
        }
    }

    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    /// Start a group of routes sharing `prefix` and leading middleware.
    pub fn group(&mut self, prefix: &str) -> Group<'_> {
        Group::new(self, prefix)
    }

    /// Serve files under `root` at `GET {prefix}/*filepath`.
    pub fn static_files(&mut self, prefix: &str, root: impl Into<PathBuf>) -> Result<Arc<Route>, RouteError> {
        let files = Arc::new(StaticFiles::new(root));
        let pattern = format!("{}/*filepath", prefix.trim_end_matches('/'));
        tracing::debug!(prefix = %prefix, root = %files.root().display(), "Static files mounted");
        self.get(&pattern, move |ctx| files.serve(ctx))
    }

    /// Handler for requests no route matches.
    pub fn set_not_found<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        self.not_found = Some(vec![Handler::new(handler)].into());
        self
    }

    /// Observer notified with every matched route.
    pub fn set_observer(&mut self, observer: Arc<dyn EventObserver>) -> &mut Self {
        self.observer = Some(observer);
        self
    }

    /// Route registered under exactly this method and pattern.
    pub fn route(&self, method: &Method, path: &str) -> Option<&Arc<Route>> {
        let id = self.keys.get(&(method.clone(), path.to_string()))?;
        self.routes.get(id.0)
    }

    /// Registered routes in registration order.
    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    /// Serve one request.
    ///
    /// Errors returned by handlers propagate unchanged.
    pub fn dispatch(&self, request: Request<Bytes>) -> Result<Response, HttpError> {
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        if let Some((id, params)) = self.matcher.lookup(&method, &path) {
            if let Some(route) = self.routes.get(id.0) {
                tracing::debug!(method = %method, path = %path, route = route.path(), "Route matched");
                return self.run_route(Arc::clone(route), params, request);
            }
        }

        let allowed = self.matcher.allowed_methods(&path);
        if !allowed.is_empty() {
            if method == Method::OPTIONS {
                tracing::debug!(path = %path, "Answering OPTIONS");
                return Ok(allow_response(StatusCode::OK, &allowed));
            }
            tracing::debug!(method = %method, path = %path, "Method not allowed");
            return Ok(allow_response(StatusCode::METHOD_NOT_ALLOWED, &allowed));
        }

        tracing::debug!(method = %method, path = %path, "No route matched");
        match &self.not_found {
            Some(chain) => {
                let mut ctx = Context::new(Arc::clone(&self.services), request, Arc::clone(chain));
                ctx.next()?;
                Ok(ctx.into_response())
            }
            None => Ok(empty_response(StatusCode::NOT_FOUND)),
        }
    }

    fn run_route(&self, route: Arc<Route>, params: Params, request: Request<Bytes>) -> Result<Response, HttpError> {
        let mut ctx = Context::new(Arc::clone(&self.services), request, route.chain());
        ctx.set_params(params).set_route(Arc::clone(&route));

        self.notify(&ctx, &route);

        ctx.next()?;
        Ok(ctx.into_response())
    }

    fn notify(&self, ctx: &Context, route: &Route) {
        let Some(observer) = &self.observer else {
            return;
        };
        let event = Event::RouteMatched { context: ctx, route };
        match panic::catch_unwind(AssertUnwindSafe(|| observer.dispatch(&event))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!(event = event.name(), error = %err, "Event observer failed");
            }
            Err(_) => {
                tracing::warn!(event = event.name(), "Event observer panicked");
            }
        }
    }
}

impl Registrar for Router {
    fn register(&mut self, method: Method, path: &str, handlers: Vec<Handler>) -> Result<Arc<Route>, RouteError> {
        if handlers.is_empty() {
            return Err(RouteError::EmptyChain {
                method,
                path: path.to_string(),
            });
        }

        let key = (method.clone(), path.to_string());
        if self.keys.contains_key(&key) {
            return Err(RouteError::Duplicate {
                method,
                path: path.to_string(),
            });
        }

        let id = RouteId(self.routes.len());
        self.matcher.insert(&method, path, id)?;

        let route = Arc::new(Route::new(method, path.to_string(), handlers));
        tracing::debug!(
            method = %route.method(),
            path = route.path(),
            handlers = route.handlers().len(),
            "Route registered"
        );
        self.routes.push(Arc::clone(&route));
        self.keys.insert(key, id);
        Ok(route)
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("not_found", &self.not_found.is_some())
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

fn empty_response(status: StatusCode) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

fn allow_response(status: StatusCode, allowed: &[Method]) -> Response {
    let mut response = empty_response(status);
    let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
    if let Ok(value) = HeaderValue::from_str(&allow) {
        response.headers_mut().insert(header::ALLOW, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut Context) -> HandlerResult {
        Ok(())
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut router = Router::new(Arc::default());
        router.get("/users/:id", noop).unwrap();
        router.post("/users/:id", noop).unwrap();

        let err = router.get("/users/:id", noop).unwrap_err();
        assert_eq!(
            err,
            RouteError::Duplicate {
                method: Method::GET,
                path: "/users/:id".into(),
            }
        );
        assert_eq!(router.routes().len(), 2);
    }

    #[test]
    fn test_empty_chain_rejected() {
        let mut router = Router::new(Arc::default());
        assert!(matches!(
            router.register(Method::GET, "/", Vec::new()),
            Err(RouteError::EmptyChain { .. })
        ));
    }

    #[test]
    fn test_route_lookup_by_key() {
        let mut router = Router::new(Arc::default());
        let route = router.put("/items/:id", noop).unwrap();

        let found = router.route(&Method::PUT, "/items/:id").unwrap();
        assert!(Arc::ptr_eq(found, &route));
        assert!(router.route(&Method::GET, "/items/:id").is_none());
    }

    #[test]
    fn test_method_not_allowed_lists_methods() {
        let mut router = Router::new(Arc::default());
        router.get("/items", noop).unwrap();
        router.post("/items", noop).unwrap();

        let request = Request::builder()
            .method(Method::DELETE)
            .uri("/items")
            .body(Bytes::new())
            .unwrap();
        let response = router.dispatch(request).unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET, POST");
    }

    #[test]
    fn test_options_on_known_path_lists_methods() {
        let mut router = Router::new(Arc::default());
        router.get("/items", noop).unwrap();
        router.post("/items", noop).unwrap();

        let options = |uri: &str| {
            Request::builder()
                .method(Method::OPTIONS)
                .uri(uri)
                .body(Bytes::new())
                .unwrap()
        };

        let response = router.dispatch(options("/items")).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ALLOW], "GET, POST");

        let unknown = router.dispatch(options("/nothing")).unwrap();
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

        router
            .register(Method::OPTIONS, "/items", vec![Handler::new(|ctx: &mut Context| {
                ctx.no_content();
                Ok(())
            })])
            .unwrap();
        let custom = router.dispatch(options("/items")).unwrap();
        assert_eq!(custom.status(), StatusCode::NO_CONTENT);
    }
}
