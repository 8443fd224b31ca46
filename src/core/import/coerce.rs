//! Incoming value coercion
//!
//! Turns the text of one XML element into the value stored in a record field. Each
//! [`FieldKind`] has its own rule, and the rule's [`LineOutcome`] tells the caller
//! whether to assign the value, skip the line, or give up on the whole record.

use crate::adapters::store::RecordStore;
use crate::domain::field::FieldKind;
use crate::domain::query::Condition;
use crate::domain::schema::SchemaLine;
use crate::domain::{EdiError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATETIME_INPUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

// Year first, then month before day.
const DATE_INPUTS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%Y%m%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%m.%d.%Y",
    "%d %B %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%b %d, %Y",
];

/// What to do with one resolved line
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// Assign the value to the field
    Value(Value),
    /// Leave the field alone; a reason is written to the log book
    Skip { reason: Option<String> },
    /// Do not import this record
    Abort(String),
}

impl LineOutcome {
    pub fn skip(reason: impl Into<String>) -> Self {
        LineOutcome::Skip {
            reason: Some(reason.into()),
        }
    }

    pub fn silent_skip() -> Self {
        LineOutcome::Skip { reason: None }
    }
}

/// Message used whenever a relational or selection value has no match
pub fn unmatched_message(xml_element: &str, raw: &str) -> String {
    format!(
        "Your [{xml_element}] field's value [{raw}] is not matched with records, so this particular row/record is skipped."
    )
}

/// Field-kind driven coercion of element text
pub struct Coercer<'a> {
    records: &'a dyn RecordStore,
}

impl<'a> Coercer<'a> {
    pub fn new(records: &'a dyn RecordStore) -> Self {
        Self { records }
    }

    /// Coerces `raw` for the field of `line`
    ///
    /// # Errors
    ///
    /// Store failures while resolving relations propagate. One2many lines are resolved
    /// through their sub schema and are rejected here.
    pub fn coerce(&self, line: &SchemaLine, raw: &str) -> Result<LineOutcome> {
        let outcome = match line.field.kind {
            FieldKind::Char | FieldKind::Text | FieldKind::Html => {
                LineOutcome::Value(Value::String(raw.to_string()))
            }
            FieldKind::Boolean => match parse_bool(raw) {
                Some(flag) => LineOutcome::Value(Value::Bool(flag)),
                None => LineOutcome::silent_skip(),
            },
            FieldKind::Float | FieldKind::Monetary => match parse_number(raw) {
                Ok(number) => LineOutcome::Value(Value::from(number)),
                Err(e) => LineOutcome::skip(format!("Something went wrong! {e}")),
            },
            FieldKind::Integer => match parse_number(raw) {
                Ok(number) => LineOutcome::Value(Value::from(number.trunc() as i64)),
                Err(e) => LineOutcome::skip(format!("Something went wrong! {e}")),
            },
            FieldKind::Date => match parse_datetime(raw) {
                Some(parsed) => LineOutcome::Value(Value::String(
                    parsed.format(DATE_FORMAT).to_string(),
                )),
                None => LineOutcome::skip(format!("Something went wrong! Unknown date format: {raw}")),
            },
            FieldKind::Datetime => match parse_datetime(raw) {
                Some(parsed) => LineOutcome::Value(Value::String(
                    parsed.format(DATETIME_FORMAT).to_string(),
                )),
                None => {
                    LineOutcome::skip(format!("Something went wrong! Unknown datetime format: {raw}"))
                }
            },
            FieldKind::Selection => coerce_selection(line, raw),
            FieldKind::Many2one => self.coerce_many2one(line, raw)?,
            FieldKind::Many2many => self.coerce_many2many(line, raw)?,
            FieldKind::One2many => {
                return Err(EdiError::DataMapping(format!(
                    "'{}' is a one2many field and is imported through its sub schema",
                    line.xml_element
                )))
            }
        };
        Ok(outcome)
    }

    fn coerce_many2one(&self, line: &SchemaLine, raw: &str) -> Result<LineOutcome> {
        let relation = relation_of(line)?;
        let search_field = line.m2o_search_field.as_deref().unwrap_or("name");
        let found = self
            .records
            .search(relation, &[Condition::eq(search_field, raw)], Some(1))?;

        Ok(match found.first() {
            Some(id) => LineOutcome::Value(Value::from(id.get())),
            None => LineOutcome::Abort(unmatched_message(&line.xml_element, raw)),
        })
    }

    fn coerce_many2many(&self, line: &SchemaLine, raw: &str) -> Result<LineOutcome> {
        let relation = relation_of(line)?;
        let mut ids = Vec::new();
        for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let found = self
                .records
                .search(relation, &[Condition::eq("name", token)], Some(1))?;
            match found.first() {
                Some(id) => ids.push(Value::from(id.get())),
                None => return Ok(LineOutcome::Abort(unmatched_message(&line.xml_element, raw))),
            }
        }
        Ok(LineOutcome::Value(Value::Array(ids)))
    }
}

fn relation_of(line: &SchemaLine) -> Result<&str> {
    line.field.relation.as_deref().ok_or_else(|| {
        EdiError::Configuration(format!(
            "Field '{}' is relational but has no related model",
            line.field.name
        ))
    })
}

fn coerce_selection(line: &SchemaLine, raw: &str) -> LineOutcome {
    let options = &line.field.selection;
    if options.iter().any(|o| o.value == raw) {
        return LineOutcome::Value(Value::String(raw.to_string()));
    }
    match options.iter().find(|o| o.label == raw) {
        Some(option) => LineOutcome::Value(Value::String(option.value.clone())),
        None => LineOutcome::Abort(unmatched_message(&line.xml_element, raw)),
    }
}

/// Case-insensitive yes/no parsing; anything else is `None`
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "yes" | "true" | "y" | "1" => Some(true),
        "no" | "false" | "n" | "0" => Some(false),
        _ => None,
    }
}

/// Parses a decimal number, accepting a comma as decimal separator
pub fn parse_number(raw: &str) -> std::result::Result<f64, String> {
    let normalized = raw.trim().replace(',', ".");
    normalized
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| format!("could not convert string to float: '{raw}'"))
}

/// Parses a date or datetime, preferring year-first then month-before-day readings
///
/// Date-only input yields midnight.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.naive_local());
    }
    for format in DATETIME_INPUTS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed);
        }
    }
    for format in DATE_INPUTS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Text carried by an element value
///
/// Attribute-bearing elements contribute their `#text`; repeated elements contribute
/// the first occurrence. Empty elements have no text.
pub fn element_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(map) => map.get("#text").and_then(element_text),
        Value::Array(items) => items.first().and_then(element_text),
        Value::Null => None,
    }
}
