//! Request identification.
//!
//! # Responsibilities
//! - Reuse the inbound `x-request-id` or generate a UUID v4
//! - Expose the id to later handlers through the side-table
//! - Echo the id on the response
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Inbound ids that are not valid header values are replaced

use uuid::Uuid;

use crate::context::{Context, HandlerResult};

/// Header carrying the request id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Side-table key under which the id is stored.
pub const REQUEST_ID_KEY: &str = "request_id";

/// Middleware assigning a request id.
pub fn request_id(ctx: &mut Context) -> HandlerResult {
    let id = ctx
        .header(X_REQUEST_ID)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    ctx.add_entity(REQUEST_ID_KEY, id.as_str());
    ctx.set_header(X_REQUEST_ID, &id)?;
    ctx.next()
}

/// Access to the id assigned by [`request_id`].
pub trait RequestIdExt {
    fn request_id(&self) -> Option<&str>;
}

impl RequestIdExt for Context {
    fn request_id(&self) -> Option<&str> {
        self.entity_as::<&str>(REQUEST_ID_KEY).ok()
    }
}
