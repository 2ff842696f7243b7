//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Registration (at startup):
//!     router.get / group(prefix).middleware(..).post / static_files
//!     → Registrar::register (method, pattern, handlers)
//!     → duplicate + pattern checks (RouteError, fatal at startup)
//!     → matcher.rs segment trie insert
//!
//! Incoming Request (method, path):
//!     → router.rs dispatch
//!     → matcher.rs lookup → (route id, params)
//!     → Context bound to the route's handler chain
//!     → ctx.next()
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (segment trie only)
//! - Deterministic: same input always matches same route
//! - Groups exist only at registration time

pub mod group;
pub mod matcher;
pub mod route;
pub mod router;

use axum::http::Method;

pub use group::Group;
pub use matcher::{PathMatcher, RouteId, SegmentTrie};
pub use route::{Registrar, Route};
pub use router::Router;

/// Route table configuration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("route {method} {path} is already registered")]
    Duplicate { method: Method, path: String },
    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: &'static str },
    #[error("route {method} {path} has no handlers")]
    EmptyChain { method: Method, path: String },
}
