//! Side-table values shared between handlers of one request.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A value stored in the per-request side-table.
#[derive(Clone)]
pub enum Entity {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Json(serde_json::Value),
    /// Arbitrary typed value, e.g. an authenticated user.
    Object(Arc<dyn Any + Send + Sync>),
}

impl Entity {
    /// Wrap an arbitrary value.
    pub fn object<T: Any + Send + Sync>(value: T) -> Self {
        Entity::Object(Arc::new(value))
    }

    /// Name of the variant, used in mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Entity::Str(_) => "string",
            Entity::Int(_) => "int",
            Entity::Float(_) => "float",
            Entity::Bool(_) => "bool",
            Entity::Json(_) => "json",
            Entity::Object(_) => "object",
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Str(v) => f.debug_tuple("Str").field(v).finish(),
            Entity::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Entity::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Entity::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Entity::Json(v) => f.debug_tuple("Json").field(v).finish(),
            Entity::Object(_) => f.write_str("Object(..)"),
        }
    }
}

impl From<String> for Entity {
    fn from(value: String) -> Self {
        Entity::Str(value)
    }
}

impl From<&str> for Entity {
    fn from(value: &str) -> Self {
        Entity::Str(value.to_string())
    }
}

impl From<i64> for Entity {
    fn from(value: i64) -> Self {
        Entity::Int(value)
    }
}

impl From<f64> for Entity {
    fn from(value: f64) -> Self {
        Entity::Float(value)
    }
}

impl From<bool> for Entity {
    fn from(value: bool) -> Self {
        Entity::Bool(value)
    }
}

impl From<serde_json::Value> for Entity {
    fn from(value: serde_json::Value) -> Self {
        Entity::Json(value)
    }
}

/// Failure reading a side-table entry.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EntityError {
    #[error("entity `{0}` not found")]
    Missing(String),
    #[error("entity `{key}` is {found}, expected {expected}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Borrowing conversion out of an [`Entity`].
pub trait EntityValue<'a>: Sized {
    const KIND: &'static str;

    fn from_entity(entity: &'a Entity) -> Option<Self>;
}

impl<'a> EntityValue<'a> for &'a str {
    const KIND: &'static str = "string";

    fn from_entity(entity: &'a Entity) -> Option<Self> {
        match entity {
            Entity::Str(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

impl<'a> EntityValue<'a> for i64 {
    const KIND: &'static str = "int";

    fn from_entity(entity: &'a Entity) -> Option<Self> {
        match entity {
            Entity::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl<'a> EntityValue<'a> for f64 {
    const KIND: &'static str = "float";

    fn from_entity(entity: &'a Entity) -> Option<Self> {
        match entity {
            Entity::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl<'a> EntityValue<'a> for bool {
    const KIND: &'static str = "bool";

    fn from_entity(entity: &'a Entity) -> Option<Self> {
        match entity {
            Entity::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl<'a> EntityValue<'a> for &'a serde_json::Value {
    const KIND: &'static str = "json";

    fn from_entity(entity: &'a Entity) -> Option<Self> {
        match entity {
            Entity::Json(v) => Some(v),
            _ => None,
        }
    }
}
