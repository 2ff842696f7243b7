//! Named application services.
//!
//! # Responsibilities
//! - Hold application-wide services under string keys
//! - Hand out typed, shared references to handlers
//!
//! # Design Decisions
//! - Populated once by the application builder, immutable afterwards
//! - Lookups fail explicitly on absence or type mismatch
//! - Services needing mutation bring their own synchronisation

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Failure resolving a named service.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("service `{0}` is not registered")]
    Missing(String),
    #[error("service `{name}` is not a {expected}")]
    TypeMismatch { name: String, expected: &'static str },
}

/// Registry of services shared by every request.
#[derive(Default)]
pub struct Services {
    entries: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `value` under `name`, replacing any previous entry.
    pub fn insert<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) -> &mut Self {
        self.insert_arc(name, Arc::new(value))
    }

    /// Register an already shared value under `name`.
    pub fn insert_arc<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: Arc<T>) -> &mut Self {
        let name = name.into();
        tracing::debug!(service = %name, "Service registered");
        self.entries.insert(name, value);
        self
    }

    /// Typed lookup; fails when the name is unknown or holds another type.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, ServiceError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| ServiceError::Missing(name.to_string()))?;
        Arc::clone(entry)
            .downcast::<T>()
            .map_err(|_| ServiceError::TypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// True if a service is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}
