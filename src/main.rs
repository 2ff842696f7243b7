//! Switchyard demo server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ axum listener ──▶ HttpServer (buffer body, timeout)
//!                                            │
//!                                            ▼ spawn_blocking
//!                                       Router::dispatch
//!                                            │ match (method, path)
//!                                            ▼
//!                      Context ──▶ [recovery, request_id, access_log,
//!                                   request_metrics, ..., handler]
//!                                            │
//!     Client Response                        ▼
//!     ◀────────────── Context::into_response (status, headers, body)
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;

use switchyard::config::{resolve_config, ConfigError};
use switchyard::http::middleware;
use switchyard::lifecycle::{wait_for_signal, DrainError};
use switchyard::observability::{logging, metrics};
use switchyard::{AppBuilder, Context, HandlerResult, Registrar, RouteError, Router, Shutdown};

#[derive(Parser)]
#[command(name = "switchyard")]
#[command(about = "HTTP request dispatch and middleware engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Bind address, overrides the config file (e.g. 127.0.0.1:8080 or :8080)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Path to a TOML config file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Logging(#[from] logging::LoggingError),
    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),
    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
    #[error("route registration failed: {0}")]
    Routes(#[from] RouteError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Drain(#[from] DrainError),
}

#[derive(Debug, Serialize)]
struct BuildInfo {
    name: &'static str,
    version: &'static str,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, config } => serve(host, config).await,
    }
}

async fn serve(host: Option<String>, config_path: Option<PathBuf>) -> Result<(), AppError> {
    let config = resolve_config(config_path.as_deref(), host.as_deref())?;

    let _log_guard = logging::init(&config.observability)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?config_path,
        "switchyard starting"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| AppError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let deadline = Duration::from_secs(config.timeouts.shutdown_secs);
    let app = AppBuilder::new(config)
        .service(
            "build_info",
            BuildInfo {
                name: env!("CARGO_PKG_NAME"),
                version: env!("CARGO_PKG_VERSION"),
            },
        )
        .routes(register_routes)
        .build()?;

    let listener = TcpListener::bind(&app.config().listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        routes = app.router().routes().len(),
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    let server = tokio::spawn(app.serve(listener, shutdown.subscribe()));

    wait_for_signal().await;
    shutdown.drain(server, deadline).await??;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn register_routes(router: &mut Router) -> Result<(), RouteError> {
    router.set_not_found(|ctx| {
        ctx.abort(404, "Route not found");
        Ok(())
    });

    let mut api = router
        .group("")
        .middleware(middleware::recovery)
        .middleware(middleware::request_id)
        .middleware(middleware::access_log)
        .middleware(middleware::request_metrics);

    api.get("/", index)?;
    api.get("/users/:id", show_user)?;

    let mut admin = api.group("/admin").middleware(require_token);
    admin.get("/whoami", whoami)?;

    Ok(())
}

fn index(ctx: &mut Context) -> HandlerResult {
    let info = ctx.service::<BuildInfo>("build_info")?;
    ctx.data(&*info)?;
    Ok(())
}

fn show_user(ctx: &mut Context) -> HandlerResult {
    let id = ctx.param("id").unwrap_or_default().to_string();
    ctx.data(json!({ "id": id }))?;
    Ok(())
}

/// Aborts with 401 unless a bearer token is present.
fn require_token(ctx: &mut Context) -> HandlerResult {
    let token = ctx
        .header("authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string);

    match token {
        Some(token) if !token.is_empty() => {
            ctx.add_entity("token", token);
            ctx.next()
        }
        _ => {
            ctx.abort(401, "Missing bearer token");
            Ok(())
        }
    }
}

fn whoami(ctx: &mut Context) -> HandlerResult {
    let token = ctx.entity_as::<&str>("token")?.to_string();
    ctx.data(json!({ "token_length": token.len() }))?;
    Ok(())
}
