//! Resolved mapping schemas
//!
//! A [`SchemaTable`] maps one XML document shape to one record model. Its lines carry the
//! target [`FieldDescriptor`] already resolved against the record store, so the engines
//! never look field metadata up by name again.

use super::field::FieldDescriptor;
use super::ids::{RecordId, SchemaId, ServerId};
use super::record::Values;
use super::transaction::Direction;
use serde::{Deserialize, Serialize};

/// Number of records carried by one document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    /// One record per file
    #[default]
    Single,
    /// Many records per file
    Multiple,
}

/// Remote folder an outgoing schema uploads to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDestination {
    pub server: ServerId,
    pub directory: String,
}

/// One XML element to field mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaLine {
    /// Slash-delimited element path relative to the record element
    pub xml_element: String,
    /// Target field, resolved against the schema's model
    pub field: FieldDescriptor,
    /// Field of the related model used to render or resolve a many2one
    pub m2o_search_field: Option<String>,
    /// Nested schema for to-many lines
    pub sub_schema: Option<SchemaId>,
    /// Maximum rendered length for text values
    pub char_length: Option<usize>,
    pub required: bool,
}

impl SchemaLine {
    /// Splits the element path into its segments
    pub fn path_segments(&self) -> Vec<&str> {
        split_path(&self.xml_element)
    }
}

/// A resolved mapping schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaTable {
    pub id: SchemaId,
    pub model: String,
    pub direction: Direction,
    pub file_type: FileType,
    pub main_table: bool,
    pub xml_header: Option<String>,
    pub multiple_records_element: Option<String>,
    pub default_values: Values,
    pub search_keys: Vec<String>,
    pub additional_filter: Option<String>,
    pub translate: bool,
    pub partner: Option<RecordId>,
    pub company: Option<RecordId>,
    pub inventory_location: Option<RecordId>,
    pub export_destination: Option<ExportDestination>,
    pub lines: Vec<SchemaLine>,
}

impl SchemaTable {
    /// Header path segments, outermost first
    pub fn header_segments(&self) -> Vec<&str> {
        self.xml_header.as_deref().map(split_path).unwrap_or_default()
    }

    /// First header segment, i.e. the document root element name
    pub fn root_element(&self) -> Option<&str> {
        self.header_segments().into_iter().next()
    }

    pub fn is_multiple(&self) -> bool {
        self.file_type == FileType::Multiple
    }

    /// Finds the line whose element path equals `xml_element`
    pub fn line_for_element(&self, xml_element: &str) -> Option<&SchemaLine> {
        self.lines.iter().find(|l| l.xml_element == xml_element)
    }
}

/// One value translation entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationEntry {
    pub schema: SchemaId,
    pub xml_element: String,
    pub xml_value: String,
    pub value: String,
}

/// Splits a slash-delimited path, ignoring empty segments
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}
