//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::http::{Method, Request};
use axum::response::Response;
use serde_json::Value;
use switchyard::{App, Context, Handler, Shutdown};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Ordered record of which handlers ran.
pub type Trace = Arc<Mutex<Vec<String>>>;

pub fn request(method: Method, uri: &str) -> Request<Bytes> {
    Request::builder().method(method).uri(uri).body(Bytes::new()).unwrap()
}

pub fn request_with(method: Method, uri: &str, headers: &[(&str, &str)], body: &str) -> Request<Bytes> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Bytes::from(body.to_string())).unwrap()
}

pub async fn body_bytes(response: Response) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Handler that records `name:in`, optionally advances, then records `name:out`.
pub fn tracer(trace: &Trace, name: &'static str, advance: bool) -> Handler {
    let trace = Arc::clone(trace);
    Handler::new(move |ctx: &mut Context| {
        trace.lock().unwrap().push(format!("{name}:in"));
        if advance {
            ctx.next()?;
        }
        trace.lock().unwrap().push(format!("{name}:out"));
        Ok(())
    })
}

pub fn entries(trace: &Trace) -> Vec<String> {
    trace.lock().unwrap().clone()
}

/// A running server bound to an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

impl TestServer {
    pub async fn start(app: App) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Shutdown::new();
        let handle = tokio::spawn(app.serve(listener, shutdown.subscribe()));
        Self { addr, shutdown, handle }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}
