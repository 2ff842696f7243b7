//! Structured HTTP errors.
//!
//! # Responsibilities
//! - Carry a status code, a human message and an optional cause
//! - Render the uniform error envelope used by every error response
//! - Preserve the causal chain for later inspection
//!
//! # Design Decisions
//! - Writing an error never moves the handler cursor; the caller returns
//! - Invalid status codes degrade to 500 instead of failing the response
//! - The envelope lists the cause chain outermost first

use std::error::Error as StdError;

use axum::http::StatusCode;
use serde::Serialize;

use crate::binding::BindingError;
use crate::context::{Context, EntityError};
use crate::services::ServiceError;

/// Boxed error used as the cause of an [`HttpError`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// An error that aborts the handler chain with a structured response.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct HttpError {
    code: u16,
    message: String,
    #[source]
    cause: Option<BoxError>,
}

/// JSON body written for every error response.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ErrorEnvelope {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
}

impl HttpError {
    /// Create an error without a cause.
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
        }
    }

    /// Create an error wrapping an underlying cause.
    pub fn with_cause(code: u16, message: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(401, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }

    /// Status code written to the envelope.
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Status code to answer with; unknown codes become 500.
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Underlying error, if any.
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// Returns true if any error in the cause chain is an `E`.
    pub fn is_caused_by<E: StdError + 'static>(&self) -> bool {
        let mut current: Option<&(dyn StdError + 'static)> = self.source();
        while let Some(err) = current {
            if err.is::<E>() {
                return true;
            }
            current = err.source();
        }
        false
    }

    /// Build the JSON envelope for this error.
    pub fn envelope(&self) -> ErrorEnvelope {
        let mut causes = Vec::new();
        let mut current: Option<&(dyn StdError + 'static)> = self.source();
        while let Some(err) = current {
            causes.push(err.to_string());
            current = err.source();
        }

        ErrorEnvelope {
            code: self.status().as_u16(),
            message: self.message.clone(),
            causes,
        }
    }

    /// Write this error to the context's response.
    ///
    /// The handler that calls this must return instead of calling
    /// [`Context::next`].
    pub fn respond(&self, ctx: &mut Context) {
        let envelope = self.envelope();
        ctx.status(self.status());
        if let Err(err) = ctx.json(&envelope) {
            tracing::error!(error = %err, "Failed to encode error envelope");
        }
    }
}

impl From<BindingError> for HttpError {
    fn from(err: BindingError) -> Self {
        Self::with_cause(400, "Malformed request body", err)
    }
}

impl From<ServiceError> for HttpError {
    fn from(err: ServiceError) -> Self {
        Self::with_cause(500, "Service unavailable", err)
    }
}

impl From<EntityError> for HttpError {
    fn from(err: EntityError) -> Self {
        Self::with_cause(500, "Request state unavailable", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("disk full")]
    struct DiskFull;

    #[derive(Debug, thiserror::Error)]
    #[error("write failed")]
    struct WriteFailed(#[source] DiskFull);

    #[test]
    fn test_cause_chain_is_inspectable() {
        let err = HttpError::with_cause(500, "save failed", WriteFailed(DiskFull));

        assert!(err.is_caused_by::<WriteFailed>());
        assert!(err.is_caused_by::<DiskFull>());
        assert!(!err.is_caused_by::<std::fmt::Error>());
        assert_eq!(err.to_string(), "save failed");
    }

    #[test]
    fn test_envelope_lists_causes() {
        let err = HttpError::with_cause(503, "upstream", WriteFailed(DiskFull));
        let envelope = err.envelope();

        assert_eq!(envelope.code, 503);
        assert_eq!(envelope.causes, vec!["write failed", "disk full"]);

        let plain = serde_json::to_value(HttpError::new(401, "nope").envelope()).unwrap();
        assert_eq!(plain, serde_json::json!({ "code": 401, "message": "nope" }));
    }

    #[test]
    fn test_invalid_code_degrades_to_500() {
        let err = HttpError::new(42, "odd");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.envelope().code, 500);
    }
}
