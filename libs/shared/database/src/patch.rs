use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Partial update body for PATCH requests. Only fields that were given
/// end up in the payload.
#[derive(Debug, Default, Clone)]
pub struct Patch {
    fields: Map<String, Value>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: Serialize>(mut self, key: &str, value: T) -> Self {
        self.fields.insert(key.to_string(), json!(value));
        self
    }

    pub fn set_opt<T: Serialize>(self, key: &str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.set(key, value),
            None => self,
        }
    }

    /// True when no caller supplied field was set.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Stamp `updated_at` and produce the JSON body.
    pub fn into_value(mut self) -> Value {
        self.fields.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));
        Value::Object(self.fields)
    }
}
