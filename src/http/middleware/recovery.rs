//! Recovery middleware.
//! Converts handler errors and panics into error envelopes.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::context::{Context, HandlerResult};
use crate::http::error::HttpError;

/// Wraps the rest of the chain; place it first.
///
/// - `Err(HttpError)` from later handlers is written with its own code.
/// - A panic is logged and answered with 500.
///
/// The failing chain's status, body and content headers are discarded;
/// headers such as `x-request-id` set on the way in are kept.
pub fn recovery(ctx: &mut Context) -> HandlerResult {
    match panic::catch_unwind(AssertUnwindSafe(|| ctx.next())) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => {
            if err.status().is_server_error() {
                tracing::error!(
                    method = %ctx.method(),
                    path = %ctx.path(),
                    code = err.code(),
                    error = %err,
                    cause = ?err.cause().map(|c| c.to_string()),
                    "Handler failed"
                );
            } else {
                tracing::warn!(
                    method = %ctx.method(),
                    path = %ctx.path(),
                    code = err.code(),
                    error = %err,
                    "Handler rejected request"
                );
            }
            ctx.reset_response();
            err.respond(ctx);
            Ok(())
        }
        Err(payload) => {
            tracing::error!(
                method = %ctx.method(),
                path = %ctx.path(),
                panic = %panic_message(payload.as_ref()),
                "Handler panicked"
            );
            ctx.reset_response();
            HttpError::internal("Internal Server Error").respond(ctx);
            Ok(())
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
