//! Typed field descriptors for business record models
//!
//! A [`ModelDescriptor`] lists the fields a record store exposes for one model. Schema
//! lines resolve against these descriptors so that coercion and rendering can dispatch on
//! a closed [`FieldKind`] instead of a string type name.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Name of the boolean flag marking a record as already exported
pub const PROCESSED_FIELD: &str = "x_is_processed";

/// Supported field kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Char,
    Text,
    Html,
    Boolean,
    Integer,
    Float,
    Monetary,
    Date,
    Datetime,
    Selection,
    Many2one,
    One2many,
    Many2many,
}

impl FieldKind {
    /// Returns true for fields pointing at other records
    pub fn is_relational(self) -> bool {
        matches!(
            self,
            FieldKind::Many2one | FieldKind::One2many | FieldKind::Many2many
        )
    }

    /// Returns true for fields holding a list of related records
    pub fn is_to_many(self) -> bool {
        matches!(self, FieldKind::One2many | FieldKind::Many2many)
    }

    /// Returns true for free-text fields subject to length truncation
    pub fn is_textual(self) -> bool {
        matches!(
            self,
            FieldKind::Char | FieldKind::Text | FieldKind::Html | FieldKind::Selection
        )
    }

    /// Returns the canonical lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Char => "char",
            FieldKind::Text => "text",
            FieldKind::Html => "html",
            FieldKind::Boolean => "boolean",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Monetary => "monetary",
            FieldKind::Date => "date",
            FieldKind::Datetime => "datetime",
            FieldKind::Selection => "selection",
            FieldKind::Many2one => "many2one",
            FieldKind::One2many => "one2many",
            FieldKind::Many2many => "many2many",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "char" => Ok(FieldKind::Char),
            "text" => Ok(FieldKind::Text),
            "html" => Ok(FieldKind::Html),
            "boolean" => Ok(FieldKind::Boolean),
            "integer" => Ok(FieldKind::Integer),
            "float" => Ok(FieldKind::Float),
            "monetary" => Ok(FieldKind::Monetary),
            "date" => Ok(FieldKind::Date),
            "datetime" => Ok(FieldKind::Datetime),
            "selection" => Ok(FieldKind::Selection),
            "many2one" => Ok(FieldKind::Many2one),
            "one2many" => Ok(FieldKind::One2many),
            "many2many" => Ok(FieldKind::Many2many),
            _ => Err(format!("Unknown field kind: {s}")),
        }
    }
}

/// One allowed value of a selection field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionOption {
    /// Stored code
    pub value: String,
    /// Display label
    pub label: String,
}

impl SelectionOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Describes one field of a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,

    /// Target model for relational fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,

    /// Back-reference field on the target model (one2many only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse_field: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selection: Vec<SelectionOption>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            relation: None,
            inverse_field: None,
            selection: Vec::new(),
        }
    }

    /// Sets the relation target model
    pub fn with_relation(mut self, model: impl Into<String>) -> Self {
        self.relation = Some(model.into());
        self
    }

    /// Sets the back-reference field for one2many
    pub fn with_inverse(mut self, field: impl Into<String>) -> Self {
        self.inverse_field = Some(field.into());
        self
    }

    /// Appends one selection option
    pub fn with_option(mut self, value: impl Into<String>, label: impl Into<String>) -> Self {
        self.selection.push(SelectionOption::new(value, label));
        self
    }
}

/// Field metadata of one model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDescriptor>,
}

impl ModelDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Adds a field, replacing any field of the same name
    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    /// Looks up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    /// Database table name derived from the model name (`res.partner` -> `res_partner`)
    pub fn table_name(&self) -> String {
        self.name.replace('.', "_")
    }
}
