//! Built-in middleware.
//!
//! Every middleware is an ordinary handler: work before `ctx.next()`,
//! work after it, or return without calling it to stop the chain.
//!
//! Suggested order, outermost first:
//! `recovery`, `request_id`, `access_log`, `request_metrics`.
//!
//! `access_log` sits inside `recovery`, so it logs a panic itself (as a
//! 500) and re-raises it for `recovery` to answer.

pub mod access_log;
pub mod metrics;
pub mod recovery;

pub use access_log::access_log;
pub use metrics::request_metrics;
pub use recovery::recovery;

pub use crate::http::request::request_id;
