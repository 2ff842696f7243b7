//! Response envelopes for structured data.
//!
//! Every data response funnels through [`Data`], serialized as
//! `{"data": ...}` with optional `meta` and `links` siblings.

use serde::Serialize;
use serde_json::{Map, Value};

/// Envelope written by the data helpers.
#[derive(Debug, Serialize)]
pub struct Data<T> {
    data: T,
    #[serde(skip_serializing_if = "Map::is_empty")]
    meta: Map<String, Value>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    links: Map<String, Value>,
}

impl<T> Data<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            meta: Map::new(),
            links: Map::new(),
        }
    }

    pub fn into_inner(self) -> T {
        self.data
    }
}

/// Shaping options for item and collection resources.
#[derive(Debug, Clone, Default)]
pub struct ResourceOption {
    /// Keep only these top-level fields; empty keeps everything.
    pub fields: Vec<String>,
    pub meta: Map<String, Value>,
    pub links: Map<String, Value>,
}

impl ResourceOption {
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn link(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.links.insert(key.into(), value.into());
        self
    }

    fn shape(&self, value: Value) -> Value {
        match value {
            Value::Object(map) if !self.fields.is_empty() => Value::Object(
                map.into_iter()
                    .filter(|(k, _)| self.fields.iter().any(|f| f == k))
                    .collect(),
            ),
            other => other,
        }
    }

    fn wrap(&self, data: Value) -> Data<Value> {
        Data {
            data,
            meta: self.meta.clone(),
            links: self.links.clone(),
        }
    }
}

/// Wrap a single value.
pub fn item<T: Serialize>(value: &T, option: &ResourceOption) -> Result<Data<Value>, serde_json::Error> {
    let value = option.shape(serde_json::to_value(value)?);
    Ok(option.wrap(value))
}

/// Wrap a list of values; `meta.count` is filled in unless already set.
pub fn collection<T: Serialize>(values: &[T], option: &ResourceOption) -> Result<Data<Value>, serde_json::Error> {
    let items = values
        .iter()
        .map(|v| serde_json::to_value(v).map(|v| option.shape(v)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut data = option.wrap(Value::Array(items));
    data.meta
        .entry("count")
        .or_insert_with(|| Value::from(values.len()));
    Ok(data)
}
