//! Access logging middleware.

use std::panic::{self, AssertUnwindSafe};

use crate::context::{Context, HandlerResult};
use crate::http::request::RequestIdExt;

/// Logs one line per request after the rest of the chain unwound.
///
/// A panic below is logged as a 500 and then resumed, so an outer
/// `recovery` still answers it.
pub fn access_log(ctx: &mut Context) -> HandlerResult {
    let result = match panic::catch_unwind(AssertUnwindSafe(|| ctx.next())) {
        Ok(result) => result,
        Err(payload) => {
            log_line(ctx, 500, true, true);
            panic::resume_unwind(payload);
        }
    };

    let status = match &result {
        Ok(()) => ctx.response_status().as_u16(),
        Err(err) => err.status().as_u16(),
    };
    log_line(ctx, status, result.is_err(), false);
    result
}

fn log_line(ctx: &Context, status: u16, failed: bool, panicked: bool) {
    let route = ctx.route().map(|r| r.path().to_string());
    tracing::info!(
        request_id = ctx.request_id().unwrap_or("-"),
        method = %ctx.method(),
        path = %ctx.path(),
        route = route.as_deref().unwrap_or("-"),
        status,
        latency_ms = ctx.elapsed().as_secs_f64() * 1000.0,
        failed,
        panicked,
        "Request completed"
    );
}
