//! Record to value-tree rendering
//!
//! Walks a schema's lines against one record and builds the nested tree that the XML
//! codec serializes. Field kinds are rendered as follows:
//!
//! | kind | rendering |
//! |------|-----------|
//! | char, text, html, selection | string, truncated to `char_length` characters |
//! | boolean | `True` / `False` |
//! | integer, float, monetary | decimal string (`3`, `12.0`, `12.5`) |
//! | date, datetime | stored value unchanged |
//! | many2one | related record's search field (default `name`), or empty |
//! | one2many, many2many | nested tree per related record via the sub-schema |

use crate::adapters::store::RecordStore;
use crate::core::registry::SchemaRegistry;
use crate::core::tree::{insert_path, wrap_under};
use crate::domain::field::FieldKind;
use crate::domain::ids::RecordId;
use crate::domain::record::{is_falsy, Record};
use crate::domain::schema::{SchemaLine, SchemaTable};
use crate::domain::{EdiError, Result};
use serde_json::Value;

/// Renders records into value trees
pub struct ValuePreparer<'a> {
    registry: &'a SchemaRegistry,
    records: &'a dyn RecordStore,
}

impl<'a> ValuePreparer<'a> {
    pub fn new(registry: &'a SchemaRegistry, records: &'a dyn RecordStore) -> Self {
        Self { registry, records }
    }

    /// Builds the value tree of one record
    ///
    /// `multiple` marks a record rendered as one item of a multi-record file; the
    /// schema's header wrap is then left to the caller.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the element when a required line resolves to
    /// an empty value; the whole export is aborted.
    pub fn prepare(&self, schema: &SchemaTable, record: &Record, multiple: bool) -> Result<Value> {
        let mut tree = schema.default_values.clone();

        for line in &schema.lines {
            let mut value = self.render_line(line, record, multiple)?;

            if line.required && is_falsy(&value) {
                return Err(EdiError::Validation(format!(
                    "Required Value is not set for {}",
                    line.xml_element
                )));
            }
            if matches!(&value, Value::Object(map) if map.is_empty()) {
                value = Value::Null;
            }
            insert_path(&mut tree, &line.xml_element, value)?;
        }

        let tree = Value::Object(tree);
        if multiple {
            return Ok(tree);
        }
        Ok(wrap_under(tree, &schema.header_segments()))
    }

    fn render_line(&self, line: &SchemaLine, record: &Record, multiple: bool) -> Result<Value> {
        let raw = record.get(&line.field.name);
        let rendered = match line.field.kind {
            FieldKind::Char | FieldKind::Text | FieldKind::Html | FieldKind::Selection => {
                Value::String(render_text(raw, line.char_length))
            }
            FieldKind::Boolean => Value::String(render_bool(raw).to_string()),
            FieldKind::Integer => Value::String(render_integer(raw)),
            FieldKind::Float | FieldKind::Monetary => Value::String(render_float(raw)),
            FieldKind::Date | FieldKind::Datetime => raw.clone(),
            FieldKind::Many2one => self.render_many2one(line, raw)?,
            FieldKind::One2many | FieldKind::Many2many => {
                self.render_to_many(line, record, multiple)?
            }
        };
        Ok(rendered)
    }

    fn render_many2one(&self, line: &SchemaLine, raw: &Value) -> Result<Value> {
        let Some(id) = raw.as_u64() else {
            return Ok(Value::String(String::new()));
        };
        let relation = relation_of(line)?;
        let Some(related) = self.records.read(relation, RecordId::new(id))? else {
            return Ok(Value::String(String::new()));
        };

        let field = line.m2o_search_field.as_deref().unwrap_or("name");
        let value = related.get(field);
        if is_falsy(value) {
            Ok(Value::String(String::new()))
        } else {
            Ok(value.clone())
        }
    }

    fn render_to_many(&self, line: &SchemaLine, record: &Record, multiple: bool) -> Result<Value> {
        let sub = self.registry.sub_schema(line)?;
        let relation = line.field.relation.as_deref().unwrap_or(&sub.model);

        let mut items = Vec::new();
        for id in record.to_many(&line.field.name) {
            if let Some(related) = self.records.read(relation, id)? {
                items.push(self.prepare(sub, &related, multiple)?);
            }
        }

        if items.len() == 1 {
            Ok(items.remove(0))
        } else {
            Ok(Value::Array(items))
        }
    }
}

fn relation_of(line: &SchemaLine) -> Result<&str> {
    line.field.relation.as_deref().ok_or_else(|| {
        EdiError::Configuration(format!(
            "Field '{}' mapped by '{}' has no related model",
            line.field.name, line.xml_element
        ))
    })
}

fn render_text(raw: &Value, char_length: Option<usize>) -> String {
    let text = match raw {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    };
    match char_length {
        Some(max) if text.chars().count() > max => text.chars().take(max).collect(),
        _ => text,
    }
}

fn render_bool(raw: &Value) -> &'static str {
    if is_falsy(raw) {
        "False"
    } else {
        "True"
    }
}

fn render_integer(raw: &Value) -> String {
    match raw {
        Value::Number(n) => n
            .as_i64()
            .map(|i| i.to_string())
            .or_else(|| n.as_f64().map(|f| (f.trunc() as i64).to_string()))
            .unwrap_or_else(|| n.to_string()),
        Value::String(s) => s.clone(),
        _ => "0".to_string(),
    }
}

fn render_float(raw: &Value) -> String {
    match raw {
        Value::Number(n) => n.as_f64().map(format_float).unwrap_or_else(|| n.to_string()),
        Value::String(s) => s.clone(),
        _ => format_float(0.0),
    }
}

/// Formats a float the way integral values keep one decimal (`12.0`)
pub(crate) fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// File name of a single-record export: `<table>_<id>_<display name>.xml`
pub fn record_file_name(record: &Record) -> String {
    format!(
        "{}_{}_{}.xml",
        record.model.replace('.', "_"),
        record.id,
        record.display_name().replace(['/', ' '], "_")
    )
}

/// File name of a multi-record export: `<table>_<id>_<id>....xml`
pub fn batch_file_name(model: &str, ids: &[RecordId]) -> String {
    let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
    format!("{}_{}.xml", model.replace('.', "_"), ids.join("_"))
}
