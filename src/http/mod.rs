//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, body buffering, timeout)
//!     → spawn_blocking(Router::dispatch)
//!     → middleware/ (recovery, request ID, access log, metrics)
//!     → route handler writes status, headers and body on the Context
//!     → Context::into_response
//!     → Send to client
//! ```

pub mod error;
pub mod middleware;
pub mod request;
pub mod server;
pub mod static_files;

pub use error::{BoxError, ErrorEnvelope, HttpError};
pub use request::{RequestIdExt, REQUEST_ID_KEY, X_REQUEST_ID};
pub use server::HttpServer;
pub use static_files::StaticFiles;
