//! Request metrics middleware.

use crate::context::{Context, HandlerResult};
use crate::observability::metrics;

/// Records count and latency labelled by route pattern, not raw path.
pub fn request_metrics(ctx: &mut Context) -> HandlerResult {
    let result = ctx.next();

    let status = match &result {
        Ok(()) => ctx.response_status().as_u16(),
        Err(err) => err.status().as_u16(),
    };
    let route = ctx.route().map(|r| r.path()).unwrap_or("none");
    metrics::record_request(ctx.method().as_str(), route, status, ctx.start_time());

    result
}
