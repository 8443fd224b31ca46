//! In-memory business record store
//!
//! Holds model metadata and record values behind a mutex. When opened with a snapshot
//! path, `commit` writes the whole store to that JSON file.

use super::snapshot::{read_snapshot, write_snapshot};
use super::traits::RecordStore;
use crate::domain::field::{FieldDescriptor, FieldKind, ModelDescriptor, PROCESSED_FIELD};
use crate::domain::ids::RecordId;
use crate::domain::query::{Condition, Operator};
use crate::domain::record::{Record, Values};
use crate::domain::{EdiError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Guard against cyclic `parent_id` chains in `child_of`
const MAX_PARENT_DEPTH: usize = 64;

#[derive(Debug, Default, Serialize, Deserialize)]
struct RecordData {
    #[serde(default)]
    models: BTreeMap<String, ModelDescriptor>,
    #[serde(default)]
    records: BTreeMap<String, BTreeMap<u64, Values>>,
    #[serde(default)]
    next_id: u64,
}

/// Record store kept in memory with optional snapshot persistence
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    data: Mutex<RecordData>,
    snapshot: Option<PathBuf>,
}

impl MemoryRecordStore {
    /// Creates an empty store without persistence
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a store backed by a snapshot file (created on first commit)
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data: RecordData = read_snapshot(&path)?;
        tracing::debug!(
            path = %path.display(),
            models = data.models.len(),
            "Opened record store snapshot"
        );
        Ok(Self {
            data: Mutex::new(data),
            snapshot: Some(path),
        })
    }

    /// Adds a model definition (builder style)
    pub fn with_model(self, model: ModelDescriptor) -> Self {
        if let Ok(mut data) = self.data.lock() {
            data.models.insert(model.name.clone(), model);
        }
        self
    }

    /// Adds or replaces a model definition
    pub fn register_model(&self, model: ModelDescriptor) -> Result<()> {
        self.lock()?.models.insert(model.name.clone(), model);
        Ok(())
    }

    /// Number of records of a model
    pub fn count(&self, model: &str) -> Result<usize> {
        Ok(self.lock()?.records.get(model).map_or(0, BTreeMap::len))
    }

    fn lock(&self) -> Result<MutexGuard<'_, RecordData>> {
        self.data
            .lock()
            .map_err(|_| EdiError::Store("Record store lock poisoned".to_string()))
    }
}

impl RecordData {
    fn model(&self, name: &str) -> Result<&ModelDescriptor> {
        self.models
            .get(name)
            .ok_or_else(|| EdiError::Configuration(format!("Model '{name}' does not exist")))
    }

    fn field<'a>(&'a self, model: &str, name: &str) -> Result<&'a FieldDescriptor> {
        self.model(model)?.field(name).ok_or_else(|| {
            EdiError::Store(format!("Invalid field '{name}' on model '{model}'"))
        })
    }

    /// Stored or computed value of one field
    fn field_value(&self, id: u64, values: &Values, field: &FieldDescriptor) -> Value {
        if field.kind == FieldKind::One2many {
            let (Some(relation), Some(inverse)) = (&field.relation, &field.inverse_field) else {
                return Value::Array(Vec::new());
            };
            let ids = self
                .records
                .get(relation)
                .map(|recs| {
                    recs.iter()
                        .filter(|(_, v)| v.get(inverse).and_then(Value::as_u64) == Some(id))
                        .map(|(child, _)| Value::from(*child))
                        .collect()
                })
                .unwrap_or_default();
            return Value::Array(ids);
        }
        values.get(&field.name).cloned().unwrap_or(Value::Null)
    }

    /// Values reached by a dotted path, one per traversed related record
    fn resolve(&self, model: &str, id: u64, values: &Values, segments: &[&str]) -> Result<Vec<Value>> {
        let Some((first, rest)) = segments.split_first() else {
            return Ok(Vec::new());
        };
        if *first == "id" && rest.is_empty() {
            return Ok(vec![Value::from(id)]);
        }

        let field = self.field(model, first)?;
        let raw = self.field_value(id, values, field);

        if rest.is_empty() {
            return Ok(match raw {
                Value::Array(items) if field.kind.is_to_many() => items,
                other => vec![other],
            });
        }

        let relation = field.relation.as_deref().ok_or_else(|| {
            EdiError::Store(format!(
                "Field '{first}' on model '{model}' is not relational"
            ))
        })?;
        let related_ids: Vec<u64> = match raw {
            Value::Number(n) => n.as_u64().into_iter().collect(),
            Value::Array(items) => items.iter().filter_map(Value::as_u64).collect(),
            _ => Vec::new(),
        };

        let mut out = Vec::new();
        for related in related_ids {
            if let Some(rel_values) = self.records.get(relation).and_then(|r| r.get(&related)) {
                out.extend(self.resolve(relation, related, rel_values, rest)?);
            }
        }
        Ok(out)
    }

    /// Model the last segment of a path points into (for `child_of`)
    fn target_model(&self, model: &str, segments: &[&str]) -> Result<String> {
        let mut current = model.to_string();
        for segment in segments {
            if *segment == "id" {
                break;
            }
            let field = self.field(&current, segment)?;
            current = field.relation.clone().ok_or_else(|| {
                EdiError::Store(format!(
                    "child_of requires a relational path, '{segment}' is not"
                ))
            })?;
        }
        Ok(current)
    }

    fn is_descendant(&self, model: &str, start: u64, ancestors: &[u64]) -> bool {
        let mut current = Some(start);
        for _ in 0..MAX_PARENT_DEPTH {
            let Some(id) = current else {
                return false;
            };
            if ancestors.contains(&id) {
                return true;
            }
            current = self
                .records
                .get(model)
                .and_then(|r| r.get(&id))
                .and_then(|v| v.get("parent_id"))
                .and_then(Value::as_u64);
        }
        false
    }

    fn matches(&self, model: &str, id: u64, values: &Values, cond: &Condition) -> Result<bool> {
        let segments: Vec<&str> = cond.segments().collect();
        let candidates = self.resolve(model, id, values, &segments)?;

        Ok(match cond.operator {
            Operator::Eq => candidates.iter().any(|c| loose_eq(c, &cond.value)),
            Operator::Ne => !candidates.iter().any(|c| loose_eq(c, &cond.value)),
            Operator::In => candidates.iter().any(|c| contains(&cond.value, c)),
            Operator::NotIn => !candidates.iter().any(|c| contains(&cond.value, c)),
            Operator::Lt => candidates.iter().any(|c| ordering(c, &cond.value) == Some(Ordering::Less)),
            Operator::Le => candidates
                .iter()
                .any(|c| matches!(ordering(c, &cond.value), Some(Ordering::Less | Ordering::Equal))),
            Operator::Gt => candidates
                .iter()
                .any(|c| ordering(c, &cond.value) == Some(Ordering::Greater)),
            Operator::Ge => candidates.iter().any(|c| {
                matches!(
                    ordering(c, &cond.value),
                    Some(Ordering::Greater | Ordering::Equal)
                )
            }),
            Operator::ChildOf => {
                let target = self.target_model(model, &segments)?;
                let ancestors: Vec<u64> = match &cond.value {
                    Value::Array(items) => items.iter().filter_map(Value::as_u64).collect(),
                    other => other.as_u64().into_iter().collect(),
                };
                candidates
                    .iter()
                    .filter_map(Value::as_u64)
                    .any(|c| self.is_descendant(&target, c, &ancestors))
            }
        })
    }

    /// Checks written values against the model, dropping computed one2many keys
    fn checked_values(&self, model: &str, values: Values) -> Result<Values> {
        let descriptor = self.model(model)?;
        let mut out = Values::new();
        for (key, value) in values {
            let field = descriptor.field(&key).ok_or_else(|| {
                EdiError::Store(format!("Invalid field '{key}' on model '{model}'"))
            })?;
            if field.kind == FieldKind::One2many {
                continue;
            }
            out.insert(key, value);
        }
        Ok(out)
    }
}

fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Bool(false)) | (Value::Bool(false), Value::Null) => true,
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn contains(list: &Value, candidate: &Value) -> bool {
    match list {
        Value::Array(items) => items.iter().any(|item| loose_eq(candidate, item)),
        single => loose_eq(candidate, single),
    }
}

fn ordering(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

impl RecordStore for MemoryRecordStore {
    fn model(&self, name: &str) -> Result<ModelDescriptor> {
        self.lock()?.model(name).cloned()
    }

    fn search(
        &self,
        model: &str,
        conditions: &[Condition],
        limit: Option<usize>,
    ) -> Result<Vec<RecordId>> {
        let data = self.lock()?;
        data.model(model)?;

        let mut found = Vec::new();
        if let Some(records) = data.records.get(model) {
            for (id, values) in records {
                let mut all = true;
                for cond in conditions {
                    if !data.matches(model, *id, values, cond)? {
                        all = false;
                        break;
                    }
                }
                if all {
                    found.push(RecordId::new(*id));
                    if limit.is_some_and(|l| found.len() >= l) {
                        break;
                    }
                }
            }
        }
        Ok(found)
    }

    fn read(&self, model: &str, id: RecordId) -> Result<Option<Record>> {
        let data = self.lock()?;
        let descriptor = data.model(model)?;
        let Some(stored) = data.records.get(model).and_then(|r| r.get(&id.get())) else {
            return Ok(None);
        };

        let mut values = stored.clone();
        for field in descriptor.fields.values() {
            if field.kind == FieldKind::One2many {
                values.insert(
                    field.name.clone(),
                    data.field_value(id.get(), stored, field),
                );
            }
        }
        Ok(Some(Record::new(id, model, values)))
    }

    fn create(&self, model: &str, values: Values) -> Result<RecordId> {
        let mut data = self.lock()?;
        let values = data.checked_values(model, values)?;
        data.next_id += 1;
        let id = data.next_id;
        data.records
            .entry(model.to_string())
            .or_default()
            .insert(id, values);
        tracing::trace!(model, id, "Record created");
        Ok(RecordId::new(id))
    }

    fn write(&self, model: &str, id: RecordId, values: Values) -> Result<()> {
        let mut data = self.lock()?;
        let values = data.checked_values(model, values)?;
        let stored = data
            .records
            .get_mut(model)
            .and_then(|r| r.get_mut(&id.get()))
            .ok_or_else(|| EdiError::Store(format!("Record {model},{id} does not exist")))?;
        for (key, value) in values {
            stored.insert(key, value);
        }
        Ok(())
    }

    fn ensure_processed_field(&self, model: &str) -> Result<()> {
        let mut data = self.lock()?;
        let descriptor = data
            .models
            .get_mut(model)
            .ok_or_else(|| EdiError::Configuration(format!("Model '{model}' does not exist")))?;
        if descriptor.field(PROCESSED_FIELD).is_none() {
            descriptor.fields.insert(
                PROCESSED_FIELD.to_string(),
                FieldDescriptor::new(PROCESSED_FIELD, FieldKind::Boolean),
            );
            tracing::info!(model, field = PROCESSED_FIELD, "Added processed flag field");
        }
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        if let Some(path) = &self.snapshot {
            let data = self.lock()?;
            write_snapshot(path, &*data)?;
        }
        Ok(())
    }
}
