//! Per-request execution context.
//!
//! # Data Flow
//! ```text
//! Router resolves route
//!     → Context::new (request, shared handler chain)
//!     → ctx.next() runs handlers[0]
//!         → handler may call ctx.next() to run handlers[1] ...
//!         → or write a response and return (abort)
//!     → Context::into_response
//! ```
//!
//! # Design Decisions
//! - The cursor only moves forward; `next()` past the end is a no-op
//! - Handlers run synchronously and nest, so post-`next()` code unwinds
//!   in reverse registration order
//! - Response is buffered and materialized once the chain returns
//! - Side-table values are a tagged union with failing typed accessors

mod entity;

pub use entity::{Entity, EntityError, EntityValue};

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use axum::body::{Body, Bytes};
use axum::http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode, Uri};
use axum::response::Response;
use cookie::Cookie;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::binding::{self, Binding, BindingError, FormFile, MultipartForm};
use crate::http::error::{BoxError, HttpError};
use crate::resource::{self, Data, ResourceOption};
use crate::routing::Route;
use crate::services::{ServiceError, Services};

/// Result returned by every handler.
pub type HandlerResult = Result<(), HttpError>;

/// Path parameters extracted by the matcher.
pub type Params = HashMap<String, String>;

type HandlerFn = dyn Fn(&mut Context) -> HandlerResult + Send + Sync;

/// A single link in a handler chain.
#[derive(Clone)]
pub struct Handler(Arc<HandlerFn>);

impl Handler {
    /// Wrap a closure or function as a handler.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Run this handler against `ctx`.
    pub fn call(&self, ctx: &mut Context) -> HandlerResult {
        (self.0)(ctx)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler(..)")
    }
}

/// Accept values that select JSON rendering.
const JSON_ACCEPTS: [&str; 2] = ["application/json", "application+json"];

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Headers describing the body; dropped by [`Context::reset_response`].
static REPRESENTATION_HEADERS: [HeaderName; 5] = [
    header::CONTENT_TYPE,
    header::CONTENT_LENGTH,
    header::CONTENT_DISPOSITION,
    header::CONTENT_ENCODING,
    header::LOCATION,
];

/// Mutable state threaded through one request's handler chain.
pub struct Context {
    parts: Parts,
    body: Bytes,
    multipart: OnceLock<MultipartForm>,
    params: Params,
    entities: HashMap<String, Entity>,
    handlers: Arc<[Handler]>,
    index: usize,
    route: Option<Arc<Route>>,
    services: Arc<Services>,
    start_time: Instant,
    status: StatusCode,
    headers: HeaderMap,
    output: Vec<u8>,
}

impl Context {
    /// Create a context bound to `handlers` with the cursor at 0.
    pub fn new(services: Arc<Services>, request: Request<Bytes>, handlers: Arc<[Handler]>) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            parts,
            body,
            multipart: OnceLock::new(),
            params: Params::new(),
            entities: HashMap::new(),
            handlers,
            index: 0,
            route: None,
            services,
            start_time: Instant::now(),
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            output: Vec::new(),
        }
    }

    pub(crate) fn set_params(&mut self, params: Params) -> &mut Self {
        self.params = params;
        self
    }

    pub(crate) fn set_route(&mut self, route: Arc<Route>) -> &mut Self {
        self.route = Some(route);
        self
    }

    /// Run the next handler in the chain.
    ///
    /// Returns immediately once the chain is exhausted.
    pub fn next(&mut self) -> HandlerResult {
        if self.index >= self.handlers.len() {
            return Ok(());
        }
        let handlers = Arc::clone(&self.handlers);
        self.index += 1;
        handlers[self.index - 1].call(self)
    }

    /// Index of the next handler to run.
    pub fn cursor(&self) -> usize {
        self.index
    }

    /// Number of handlers in the chain.
    pub fn chain_len(&self) -> usize {
        self.handlers.len()
    }

    /// True once every handler has been entered.
    pub fn is_exhausted(&self) -> bool {
        self.index >= self.handlers.len()
    }

    /// Matched route, `None` for the not-found chain.
    pub fn route(&self) -> Option<&Route> {
        self.route.as_deref()
    }

    /// When the context was created.
    pub fn start_time(&self) -> Instant {
        self.start_time
    }

    /// Time since [`Context::start_time`].
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    // ---------------------------------------------------------------- request

    /// Request method.
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// Request URI as received.
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Request path, still percent-encoded.
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// Inbound request headers.
    pub fn request_headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Buffered request body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// All path parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Decoded path parameter `key`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// First query-string value for `key`.
    pub fn query(&self, key: &str) -> Option<String> {
        let query = self.parts.uri.query()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// First form body value for `key`, url-encoded or multipart.
    pub fn post(&self, key: &str) -> Option<String> {
        if self.is_form_body() {
            return url::form_urlencoded::parse(&self.body)
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned());
        }
        self.multipart_form()
            .ok()
            .flatten()
            .and_then(|form| form.value(key))
            .map(str::to_string)
    }

    /// Body value for `key`, falling back to the query string.
    pub fn form(&self, key: &str) -> Option<String> {
        self.post(key).or_else(|| self.query(key))
    }

    /// Request header `key`, if it is valid UTF-8.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.parts.headers.get(key).and_then(|v| v.to_str().ok())
    }

    /// Raw request `Content-Type`.
    pub fn content_type(&self) -> Option<&str> {
        self.header(header::CONTENT_TYPE.as_str())
    }

    /// Request cookie `name`.
    pub fn cookie(&self, name: &str) -> Option<Cookie<'static>> {
        self.parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .find(|c| c.name() == name)
            .map(Cookie::into_owned)
    }

    /// True when the `Accept` header asks for JSON.
    pub fn is_json(&self) -> bool {
        self.header(header::ACCEPT.as_str())
            .map(|accept| {
                accept.split(',').any(|item| {
                    let media = item.split(';').next().unwrap_or_default().trim();
                    JSON_ACCEPTS.contains(&media)
                })
            })
            .unwrap_or(false)
    }

    /// Decode the body according to its `Content-Type`.
    pub fn bind<T: DeserializeOwned>(&self) -> Result<T, BindingError> {
        binding::bind(self.content_type(), &self.body)
    }

    /// Decode body form values and query values into `T`.
    ///
    /// Body values win over query values with the same key.
    pub fn form_decode<T: DeserializeOwned>(&self) -> Result<T, BindingError> {
        let mut pairs: Vec<(String, String)> = Vec::new();
        if self.is_form_body() {
            pairs.extend(url::form_urlencoded::parse(&self.body).into_owned());
        } else if let Some(form) = self.multipart_form()? {
            pairs.extend(form.fields().iter().cloned());
        }
        if let Some(query) = self.parts.uri.query() {
            pairs.extend(url::form_urlencoded::parse(query.as_bytes()).into_owned());
        }
        binding::decode_pairs(pairs)
    }

    /// First file uploaded under `key` in a multipart body.
    pub fn form_file(&self, key: &str) -> Result<&FormFile, BindingError> {
        self.multipart_form()?
            .and_then(|form| form.file(key))
            .ok_or_else(|| BindingError::MissingFile(key.to_string()))
    }

    fn is_form_body(&self) -> bool {
        self.content_type()
            .map(|ct| ct.starts_with(FORM_URLENCODED))
            .unwrap_or(false)
    }

    /// Parsed multipart body, `None` for other content types.
    ///
    /// Parsed once; a malformed body is reparsed (and fails) on every call.
    fn multipart_form(&self) -> Result<Option<&MultipartForm>, BindingError> {
        let Some(content_type) = self.content_type() else {
            return Ok(None);
        };
        if Binding::for_content_type(content_type) != Some(Binding::MultipartForm) {
            return Ok(None);
        }
        if let Some(form) = self.multipart.get() {
            return Ok(Some(form));
        }
        let form = binding::parse_multipart(content_type, self.body.clone())?;
        Ok(Some(self.multipart.get_or_init(|| form)))
    }

    // ------------------------------------------------------------- side-table

    /// Store a value for later handlers; last write wins.
    pub fn add_entity(&mut self, key: impl Into<String>, value: impl Into<Entity>) -> &mut Self {
        self.entities.insert(key.into(), value.into());
        self
    }

    /// Raw side-table entry.
    pub fn entity(&self, key: &str) -> Option<&Entity> {
        self.entities.get(key)
    }

    /// Typed read of a side-table entry.
    pub fn entity_as<'a, T: EntityValue<'a>>(&'a self, key: &str) -> Result<T, EntityError> {
        let entity = self
            .entities
            .get(key)
            .ok_or_else(|| EntityError::Missing(key.to_string()))?;
        T::from_entity(entity).ok_or_else(|| EntityError::TypeMismatch {
            key: key.to_string(),
            expected: T::KIND,
            found: entity.kind(),
        })
    }

    /// Typed read of an [`Entity::Object`] entry.
    pub fn entity_object<T: Any + Send + Sync>(&self, key: &str) -> Result<Arc<T>, EntityError> {
        let entity = self
            .entities
            .get(key)
            .ok_or_else(|| EntityError::Missing(key.to_string()))?;
        let mismatch = || EntityError::TypeMismatch {
            key: key.to_string(),
            expected: std::any::type_name::<T>(),
            found: entity.kind(),
        };
        match entity {
            Entity::Object(value) => Arc::clone(value).downcast::<T>().map_err(|_| mismatch()),
            _ => Err(mismatch()),
        }
    }

    /// Look up an application service by name.
    pub fn service<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, ServiceError> {
        self.services.get(name)
    }

    // --------------------------------------------------------------- response

    /// Set the response status.
    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    /// Response status written so far.
    pub fn response_status(&self) -> StatusCode {
        self.status
    }

    /// Response headers written so far.
    pub fn response_headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Response body written so far.
    pub fn response_body(&self) -> &[u8] {
        &self.output
    }

    /// Set a response header, replacing any previous value.
    pub fn set_header(&mut self, key: &str, value: &str) -> Result<&mut Self, HttpError> {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| HttpError::with_cause(500, "Invalid response header", e))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| HttpError::with_cause(500, "Invalid response header", e))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Append to the response body.
    pub fn write(&mut self, bytes: &[u8]) -> &mut Self {
        self.output.extend_from_slice(bytes);
        self
    }

    /// Append UTF-8 text to the response body.
    pub fn string(&mut self, content: &str) -> &mut Self {
        self.write(content.as_bytes())
    }

    /// Set status 204.
    pub fn no_content(&mut self) -> &mut Self {
        self.status(StatusCode::NO_CONTENT)
    }

    /// Set status 201.
    pub fn created(&mut self) -> &mut Self {
        self.status(StatusCode::CREATED)
    }

    /// Drop the status, body and body-describing headers written so far.
    ///
    /// Other headers, such as `x-request-id`, survive.
    pub fn reset_response(&mut self) -> &mut Self {
        self.status = StatusCode::OK;
        for name in REPRESENTATION_HEADERS.iter() {
            self.headers.remove(name);
        }
        self.output.clear();
        self
    }

    /// Encode `content` as the JSON response body.
    pub fn json<T: Serialize + ?Sized>(&mut self, content: &T) -> Result<&mut Self, HttpError> {
        let encoded = serde_json::to_vec(content)
            .map_err(|e| HttpError::with_cause(500, "Failed to encode response", e))?;
        self.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Ok(self.write(&encoded))
    }

    /// Respond with `{"data": content}`.
    pub fn data<T: Serialize>(&mut self, content: T) -> Result<&mut Self, HttpError> {
        self.json(&Data::new(content))
    }

    /// Respond with one resource in the `{"data": ...}` envelope.
    pub fn item<T: Serialize>(&mut self, value: &T, option: &ResourceOption) -> Result<&mut Self, HttpError> {
        let data = resource::item(value, option)
            .map_err(|e| HttpError::with_cause(500, "Failed to encode resource", e))?;
        self.json(&data)
    }

    /// Respond with a list of resources in the `{"data": [...]}` envelope.
    pub fn collection<T: Serialize>(&mut self, values: &[T], option: &ResourceOption) -> Result<&mut Self, HttpError> {
        let data = resource::collection(values, option)
            .map_err(|e| HttpError::with_cause(500, "Failed to encode resource", e))?;
        self.json(&data)
    }

    /// Set `Location` and a redirect status.
    pub fn redirect(&mut self, location: &str, status: StatusCode) -> Result<&mut Self, HttpError> {
        self.set_header(header::LOCATION.as_str(), location)?;
        Ok(self.status(status))
    }

    /// Send a file from disk as the response body.
    pub fn file(&mut self, path: &Path) -> Result<&mut Self, HttpError> {
        let contents = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => HttpError::with_cause(404, "File not found", e),
            _ => HttpError::with_cause(500, "Failed to read file", e),
        })?;
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        self.set_header(header::CONTENT_TYPE.as_str(), mime.as_ref())?;
        Ok(self.write(&contents))
    }

    /// Send a file as a download named `filename`.
    pub fn file_attachment(&mut self, path: &Path, filename: &str) -> Result<&mut Self, HttpError> {
        self.set_header(
            header::CONTENT_DISPOSITION.as_str(),
            &format!("attachment; filename=\"{}\"", filename),
        )?;
        self.file(path)
    }

    /// Write an error envelope without a cause.
    pub fn abort(&mut self, code: u16, message: &str) {
        HttpError::new(code, message).respond(self);
    }

    /// Write an error envelope. The cursor does not move; return afterwards.
    pub fn abort_with_error(&mut self, code: u16, message: &str, cause: Option<BoxError>) {
        let err = match cause {
            Some(cause) => HttpError::with_cause(code, message, cause),
            None => HttpError::new(code, message),
        };
        err.respond(self);
    }

    /// Materialize the buffered response.
    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.output));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("method", &self.parts.method)
            .field("path", &self.parts.uri.path())
            .field("params", &self.params)
            .field("cursor", &self.index)
            .field("chain_len", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    type Trace = Arc<Mutex<Vec<String>>>;

    fn request(uri: &str) -> Request<Bytes> {
        Request::builder().uri(uri).body(Bytes::new()).unwrap()
    }

    fn context(handlers: Vec<Handler>) -> Context {
        Context::new(Arc::new(Services::new()), request("/"), handlers.into())
    }

    fn tracer(trace: &Trace, name: &'static str, advance: bool) -> Handler {
        let trace = Arc::clone(trace);
        Handler::new(move |ctx| {
            trace.lock().unwrap().push(format!("{name}:in"));
            if advance {
                ctx.next()?;
            }
            trace.lock().unwrap().push(format!("{name}:out"));
            Ok(())
        })
    }

    #[test]
    fn test_next_runs_handlers_nested() {
        let trace: Trace = Arc::default();
        let mut ctx = context(vec![
            tracer(&trace, "a", true),
            tracer(&trace, "b", true),
            tracer(&trace, "c", true),
        ]);

        ctx.next().unwrap();

        assert_eq!(
            *trace.lock().unwrap(),
            vec!["a:in", "b:in", "c:in", "c:out", "b:out", "a:out"]
        );
        assert!(ctx.is_exhausted());
        assert_eq!(ctx.cursor(), 3);
    }

    #[test]
    fn test_abort_stops_forward_progress() {
        let trace: Trace = Arc::default();
        let mut ctx = context(vec![
            tracer(&trace, "a", true),
            tracer(&trace, "b", false),
            tracer(&trace, "c", true),
        ]);

        ctx.next().unwrap();

        assert_eq!(*trace.lock().unwrap(), vec!["a:in", "b:in", "b:out", "a:out"]);
        assert_eq!(ctx.cursor(), 2);
    }

    #[test]
    fn test_next_after_exhaustion_is_noop() {
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let mut ctx = context(vec![Handler::new(move |_| {
            *counter.lock().unwrap() += 1;
            Ok(())
        })]);

        ctx.next().unwrap();
        ctx.next().unwrap();
        ctx.next().unwrap();

        assert_eq!(*calls.lock().unwrap(), 1);
        assert_eq!(ctx.cursor(), 1);
    }

    #[test]
    fn test_empty_chain_is_exhausted() {
        let mut ctx = context(Vec::new());
        assert!(ctx.next().is_ok());
        assert_eq!(ctx.cursor(), 0);
    }

    #[test]
    fn test_is_json() {
        let json = Request::builder()
            .header("Accept", "text/html,application/json")
            .body(Bytes::new())
            .unwrap();
        let ctx = Context::new(Arc::new(Services::new()), json, Vec::<Handler>::new().into());
        assert!(ctx.is_json());

        let html = Request::builder()
            .header("Accept", "text/html")
            .body(Bytes::new())
            .unwrap();
        let ctx = Context::new(Arc::new(Services::new()), html, Vec::<Handler>::new().into());
        assert!(!ctx.is_json());

        assert!(!context(Vec::new()).is_json());
    }

    #[test]
    fn test_entities_typed_access() {
        #[derive(Debug, PartialEq)]
        struct User {
            id: u32,
        }

        let mut ctx = context(Vec::new());
        ctx.add_entity("name", "ada")
            .add_entity("age", 36_i64)
            .add_entity("user", Entity::object(User { id: 7 }));

        assert_eq!(ctx.entity_as::<&str>("name").unwrap(), "ada");
        assert_eq!(ctx.entity_as::<i64>("age").unwrap(), 36);
        assert_eq!(ctx.entity_object::<User>("user").unwrap().id, 7);

        assert_eq!(
            ctx.entity_as::<bool>("name"),
            Err(EntityError::TypeMismatch {
                key: "name".into(),
                expected: "bool",
                found: "string",
            })
        );
        assert_eq!(
            ctx.entity_as::<i64>("missing"),
            Err(EntityError::Missing("missing".into()))
        );
        assert!(ctx.entity_object::<String>("user").is_err());

        ctx.add_entity("age", 37_i64);
        assert_eq!(ctx.entity_as::<i64>("age").unwrap(), 37);
    }

    #[test]
    fn test_query_form_and_cookie() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/search?q=rust&page=2")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Cookie", "session=abc; theme=dark")
            .body(Bytes::from_static(b"q=tokio&limit=10"))
            .unwrap();
        let ctx = Context::new(Arc::new(Services::new()), req, Vec::<Handler>::new().into());

        assert_eq!(ctx.query("q").as_deref(), Some("rust"));
        assert_eq!(ctx.post("limit").as_deref(), Some("10"));
        assert_eq!(ctx.form("q").as_deref(), Some("tokio"));
        assert_eq!(ctx.form("page").as_deref(), Some("2"));
        assert_eq!(ctx.cookie("theme").unwrap().value(), "dark");
        assert!(ctx.cookie("missing").is_none());
    }

    #[test]
    fn test_form_decode_prefers_body() {
        #[derive(serde::Deserialize)]
        struct Search {
            q: String,
            page: u32,
        }

        let req = Request::builder()
            .method(Method::POST)
            .uri("/search?q=rust&page=2")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Bytes::from_static(b"q=tokio"))
            .unwrap();
        let ctx = Context::new(Arc::new(Services::new()), req, Vec::<Handler>::new().into());

        let search: Search = ctx.form_decode().unwrap();
        assert_eq!(search.q, "tokio");
        assert_eq!(search.page, 2);
    }

    #[test]
    fn test_abort_writes_envelope() {
        let mut ctx = context(Vec::new());
        ctx.abort(401, "missing token");

        assert_eq!(ctx.response_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ctx.response_headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let body: serde_json::Value = serde_json::from_slice(ctx.response_body()).unwrap();
        assert_eq!(body, serde_json::json!({ "code": 401, "message": "missing token" }));
        assert_eq!(ctx.cursor(), 0);
    }

    #[test]
    fn test_data_envelope() {
        let mut ctx = context(Vec::new());
        ctx.data(serde_json::json!({ "id": "42" })).unwrap();
        assert_eq!(ctx.response_body(), br#"{"data":{"id":"42"}}"#);
    }

    #[test]
    fn test_reset_response_keeps_unrelated_headers() {
        let mut ctx = context(Vec::new());
        ctx.set_header("x-request-id", "abc").unwrap();
        ctx.created().data(serde_json::json!({ "id": 1 })).unwrap();

        ctx.reset_response();
        assert_eq!(ctx.response_status(), StatusCode::OK);
        assert!(ctx.response_body().is_empty());
        assert!(ctx.response_headers().get(header::CONTENT_TYPE).is_none());
        assert_eq!(ctx.response_headers()["x-request-id"], "abc");
    }

    #[test]
    fn test_redirect_sets_location() {
        let mut ctx = context(Vec::new());
        ctx.redirect("/login?next=%2Fadmin", StatusCode::FOUND).unwrap();

        let response = ctx.into_response();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/login?next=%2Fadmin");
    }

    #[test]
    fn test_file_attachment_sets_disposition() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        std::fs::write(&path, "id,name\n1,ada\n").unwrap();

        let mut ctx = context(Vec::new());
        ctx.file_attachment(&path, "march.csv").unwrap();

        assert_eq!(ctx.response_status(), StatusCode::OK);
        assert_eq!(
            ctx.response_headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"march.csv\""
        );
        assert_eq!(ctx.response_headers()[header::CONTENT_TYPE], "text/csv");
        assert_eq!(ctx.response_body(), b"id,name\n1,ada\n");

        let mut missing = context(Vec::new());
        let err = missing.file(&dir.path().join("nope.txt")).unwrap_err();
        assert_eq!(err.code(), 404);
    }

    #[derive(Serialize)]
    struct Book {
        id: u32,
        title: &'static str,
        isbn: &'static str,
    }

    const BOOKS: [Book; 2] = [
        Book {
            id: 1,
            title: "Dune",
            isbn: "0441013597",
        },
        Book {
            id: 2,
            title: "Emma",
            isbn: "0141439580",
        },
    ];

    #[test]
    fn test_item_and_collection_envelopes() {
        let option = ResourceOption::default().fields(["id", "title"]);

        let mut ctx = context(Vec::new());
        ctx.item(&BOOKS[0], &option).unwrap();
        assert_eq!(
            ctx.response_headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let body: serde_json::Value = serde_json::from_slice(ctx.response_body()).unwrap();
        assert_eq!(body, serde_json::json!({ "data": { "id": 1, "title": "Dune" } }));

        let mut ctx = context(Vec::new());
        ctx.collection(&BOOKS, &option.meta("page", 1)).unwrap();
        let body: serde_json::Value = serde_json::from_slice(ctx.response_body()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "data": [{ "id": 1, "title": "Dune" }, { "id": 2, "title": "Emma" }],
                "meta": { "page": 1, "count": 2 }
            })
        );
    }

    fn multipart_request(uri: &str) -> Request<Bytes> {
        let body = "--b0undary\r\n\
                    Content-Disposition: form-data; name=\"title\"\r\n\r\n\
                    Dune\r\n\
                    --b0undary\r\n\
                    Content-Disposition: form-data; name=\"cover\"; filename=\"dune.jpg\"\r\n\
                    Content-Type: image/jpeg\r\n\r\n\
                    JPEG\r\n\
                    --b0undary--\r\n";
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("Content-Type", "multipart/form-data; boundary=b0undary")
            .body(Bytes::from_static(body.as_bytes()))
            .unwrap()
    }

    #[test]
    fn test_multipart_form_values_and_files() {
        #[derive(serde::Deserialize)]
        struct Upload {
            title: String,
            page: u32,
        }

        let req = multipart_request("/books?title=Emma&page=3");
        let ctx = Context::new(Arc::new(Services::new()), req, Vec::<Handler>::new().into());

        assert_eq!(ctx.post("title").as_deref(), Some("Dune"));
        assert_eq!(ctx.form("title").as_deref(), Some("Dune"));
        assert_eq!(ctx.form("page").as_deref(), Some("3"));
        assert!(ctx.post("cover").is_none());

        let upload: Upload = ctx.form_decode().unwrap();
        assert_eq!(upload.title, "Dune");
        assert_eq!(upload.page, 3);

        let cover = ctx.form_file("cover").unwrap();
        assert_eq!(cover.file_name(), Some("dune.jpg"));
        assert_eq!(cover.data().as_ref(), b"JPEG");
        assert!(matches!(
            ctx.form_file("title"),
            Err(BindingError::MissingFile(key)) if key == "title"
        ));

        let plain = context(Vec::new());
        assert!(matches!(plain.form_file("cover"), Err(BindingError::MissingFile(_))));
    }
}
