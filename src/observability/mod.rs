//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Handler chains produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (request counters and latency histograms)
//!
//! Consumers:
//!     → console channel (pretty for development, JSON for production)
//!     → file channel (rotating JSON files)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the side-table and every access log line
//! - Metrics are labelled by route pattern, never by raw path
//! - Both are initialized once at startup; middleware only records

pub mod logging;
pub mod metrics;
