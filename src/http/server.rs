//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum service that feeds every request to the router
//! - Wire up transport middleware (tracing, request timeout)
//! - Buffer request bodies up to the configured limit
//! - Run each handler chain on a blocking worker
//! - Contain unrecovered handler failures to their own request

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::routing::Router;

/// State shared by the transport handler.
#[derive(Clone)]
struct TransportState {
    router: Arc<Router>,
    max_body_bytes: usize,
}

/// HTTP server wrapping a fully-built [`Router`].
pub struct HttpServer {
    app: axum::Router,
    config: ServerConfig,
}

impl HttpServer {
    pub fn new(router: Arc<Router>, config: ServerConfig) -> Self {
        let state = TransportState {
            router,
            max_body_bytes: config.http.max_body_bytes,
        };
        let app = Self::build_app(&config, state);
        Self { app, config }
    }

    /// Build the Axum service with all transport layers.
    #[allow(deprecated)]
    fn build_app(config: &ServerConfig, state: TransportState) -> axum::Router {
        axum::Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
    }

    /// The Axum service, for embedding or in-process tests.
    pub fn into_service(self) -> axum::Router {
        self.app
    }

    /// Serve until a shutdown signal arrives, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            request_timeout_secs = self.config.timeouts.request_secs,
            "HTTP server starting"
        );

        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Feeds every request to the router.
async fn dispatch_handler(State(state): State<TransportState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(path = %parts.uri.path(), error = %err, "Request body rejected");
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    let request = Request::from_parts(parts, body);
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let router = Arc::clone(&state.router);

    match tokio::task::spawn_blocking(move || router.dispatch(request)).await {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => {
            tracing::error!(
                method = %method,
                path = %path,
                code = err.code(),
                error = %err,
                "Unrecovered handler error"
            );
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(err) => {
            tracing::error!(method = %method, path = %path, error = %err, "Handler task panicked");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::http::error::HttpError;
    use crate::routing::Registrar;
    use tower::ServiceExt;

    fn service(router: Router, max_body_bytes: usize) -> axum::Router {
        let mut config = ServerConfig::default();
        config.http.max_body_bytes = max_body_bytes;
        HttpServer::new(Arc::new(router), config).into_service()
    }

    async fn status_of(app: axum::Router, uri: &str, body: &'static str) -> StatusCode {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::from(body))
            .unwrap();
        app.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_unrecovered_failures_become_bare_500() {
        let mut router = Router::new(Arc::default());
        router
            .post("/error", |_: &mut Context| Err(HttpError::new(418, "teapot")))
            .unwrap();
        router.post("/panic", |_: &mut Context| panic!("boom")).unwrap();
        router
            .post("/echo", |ctx: &mut Context| {
                let body = ctx.body().clone();
                ctx.write(&body);
                Ok(())
            })
            .unwrap();
        let app = service(router, 8);

        assert_eq!(status_of(app.clone(), "/error", "").await, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_of(app.clone(), "/panic", "").await, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_of(app.clone(), "/echo", "short").await, StatusCode::OK);
        assert_eq!(
            status_of(app, "/echo", "far too long for the limit").await,
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }
}
