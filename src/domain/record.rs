//! Business record representation
//!
//! Records are loosely typed: field values are JSON values interpreted through the
//! model's [`FieldDescriptor`](super::field::FieldDescriptor)s. A many2one value is the
//! related record's numeric id, a to-many value is an array of ids.

use super::ids::RecordId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered field/value map
pub type Values = serde_json::Map<String, Value>;

/// One business record as read from a record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub model: String,
    #[serde(default)]
    pub values: Values,
}

impl Record {
    pub fn new(id: RecordId, model: impl Into<String>, values: Values) -> Self {
        Self {
            id,
            model: model.into(),
            values,
        }
    }

    /// Returns a field value, `Null` when unset
    pub fn get(&self, field: &str) -> &Value {
        self.values.get(field).unwrap_or(&Value::Null)
    }

    /// Reads a many2one value as a record id
    pub fn many2one(&self, field: &str) -> Option<RecordId> {
        self.get(field).as_u64().map(RecordId::new)
    }

    /// Reads a to-many value as a list of record ids
    pub fn to_many(&self, field: &str) -> Vec<RecordId> {
        match self.get(field) {
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_u64)
                .map(RecordId::new)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Human-readable name: `display_name`, then `name`, then `model,id`
    pub fn display_name(&self) -> String {
        for key in ["display_name", "name"] {
            if let Some(Value::String(name)) = self.values.get(key) {
                if !name.is_empty() {
                    return name.clone();
                }
            }
        }
        format!("{},{}", self.model, self.id)
    }
}

/// Python-like truthiness used by required checks and empty-value detection
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map(|f| f == 0.0).unwrap_or(false),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}
