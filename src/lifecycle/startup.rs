//! Startup orchestration.
//!
//! # Responsibilities
//! - Collect services, the event observer and route registrations
//! - Build the router once, in a fixed order
//! - Mount configured static directories
//! - Hand the finished router to the HTTP server
//!
//! # Design Decisions
//! - Fail fast: the first registration error aborts the build
//! - Services are frozen before any route is registered
//! - Static mounts register before application routes

use std::any::Any;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::ServerConfig;
use crate::events::EventObserver;
use crate::http::HttpServer;
use crate::routing::{RouteError, Router};
use crate::services::Services;

type RouteSetup = Box<dyn FnOnce(&mut Router) -> Result<(), RouteError>>;

/// Assembles an [`App`] from configuration and registration callbacks.
pub struct AppBuilder {
    config: ServerConfig,
    services: Services,
    observer: Option<Arc<dyn EventObserver>>,
    setups: Vec<RouteSetup>,
}

impl AppBuilder {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            services: Services::new(),
            observer: None,
            setups: Vec::new(),
        }
    }

    /// Register a shared service handlers can look up by name.
    pub fn service<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.services.insert(name, value);
        self
    }

    /// Observer notified of every matched route.
    pub fn observer(mut self, observer: Arc<dyn EventObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Queue a registration callback. Callbacks run in the order given.
    pub fn routes<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut Router) -> Result<(), RouteError> + 'static,
    {
        self.setups.push(Box::new(setup));
        self
    }

    /// Mount static directories, then run the route callbacks in order.
    pub fn build(self) -> Result<App, RouteError> {
        let mut router = Router::new(Arc::new(self.services));
        if let Some(observer) = self.observer {
            router.set_observer(observer);
        }

        for mount in &self.config.static_files {
            router.static_files(&mount.prefix, &mount.root)?;
        }

        for setup in self.setups {
            setup(&mut router)?;
        }

        tracing::info!(
            routes = router.routes().len(),
            static_mounts = self.config.static_files.len(),
            "Router built"
        );

        Ok(App {
            router: Arc::new(router),
            config: self.config,
        })
    }
}

/// A fully-built application, ready to serve.
pub struct App {
    router: Arc<Router>,
    config: ServerConfig,
}

impl App {
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn into_server(self) -> HttpServer {
        HttpServer::new(self.router, self.config)
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn serve(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        self.into_server().run(listener, shutdown).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticMount;
    use crate::context::Context;
    use crate::routing::Registrar;
    use axum::http::Method;

    #[test]
    fn test_build_registers_mounts_then_routes() {
        let mut config = ServerConfig::default();
        config.static_files.push(StaticMount {
            prefix: "/assets".into(),
            root: "./public".into(),
        });

        let app = AppBuilder::new(config)
            .service("greeting", String::from("hello"))
            .routes(|router| {
                router.get("/", |_: &mut Context| Ok(()))?;
                Ok(())
            })
            .build()
            .unwrap();

        let paths: Vec<_> = app.router().routes().iter().map(|r| r.path().to_string()).collect();
        assert_eq!(paths, vec!["/assets/*filepath", "/"]);
        assert!(app.router().services().contains("greeting"));
        assert!(app.router().route(&Method::GET, "/").is_some());
    }

    #[test]
    fn test_build_fails_on_registration_error() {
        let result = AppBuilder::new(ServerConfig::default())
            .routes(|router| {
                router.get("/dup", |_: &mut Context| Ok(()))?;
                router.get("/dup", |_: &mut Context| Ok(()))?;
                Ok(())
            })
            .build();

        assert!(matches!(result, Err(RouteError::Duplicate { .. })));
    }
}
