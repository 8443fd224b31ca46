//! XML codec
//!
//! Converts between XML documents and JSON value trees. The tree shape follows the
//! usual dict-style mapping:
//!
//! - an element with children becomes an object keyed by child name
//! - repeated sibling elements become an array under one key
//! - attributes become `@name` keys, mixed text becomes `#text`
//! - an empty element decodes to `null`; `null`, booleans and empty objects encode to an
//!   empty element
//!
//! # Example
//!
//! ```rust
//! use ediflow::core::xml::{decode, encode};
//! use serde_json::json;
//!
//! let tree = json!({"Partner": {"Name": "Acme"}});
//! let xml = encode(&tree["Partner"], "Partner").unwrap();
//! assert!(xml.contains("<Name>Acme</Name>"));
//! assert_eq!(decode(&xml).unwrap(), tree);
//! ```

use crate::domain::{EdiError, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Value};

/// Root element used when a tree has no single top-level key
pub const DEFAULT_ROOT: &str = "data";

const TEXT_KEY: &str = "#text";
const ATTRIBUTE_PREFIX: char = '@';

/// Encodes `tree` as the content of a `root_name` element
///
/// The output starts with a UTF-8 declaration and is indented by two spaces. If the
/// indentation pass fails the compact rendering is returned instead.
pub fn encode(tree: &Value, root_name: &str) -> Result<String> {
    let compact = encode_compact(tree, root_name)?;
    match reindent(&compact) {
        Ok(pretty) => Ok(pretty),
        Err(e) => {
            tracing::warn!(error = %e, "Pretty-printing failed, using compact XML");
            Ok(compact)
        }
    }
}

/// Encodes a whole document tree
///
/// An object with exactly one non-list key is rendered with that key as the root
/// element; anything else is wrapped in a `<data>` root.
pub fn encode_document(tree: &Value) -> Result<String> {
    match tree {
        Value::Object(map) if map.len() == 1 && !map.values().any(Value::is_array) => {
            let (root, content) = map
                .iter()
                .next()
                .ok_or_else(|| EdiError::Xml("document has no root".to_string()))?;
            encode(content, root)
        }
        other => encode(other, DEFAULT_ROOT),
    }
}

/// Decodes an XML document into a value tree keyed by its root element
///
/// # Errors
///
/// Returns [`EdiError::InvalidXml`] for blank input without attempting to parse, and
/// [`EdiError::Xml`] for malformed documents.
pub fn decode(xml: &str) -> Result<Value> {
    if xml.trim().is_empty() {
        return Err(EdiError::InvalidXml("XML document is empty".to_string()));
    }

    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<Value> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(Frame::open(&e)?),
            Event::Empty(e) => {
                let frame = Frame::open(&e)?;
                close_frame(frame, &mut stack, &mut root)?;
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| EdiError::Xml("unexpected closing tag".to_string()))?;
                close_frame(frame, &mut stack, &mut root)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(EdiError::Xml("document ended inside an element".to_string()));
    }
    root.ok_or_else(|| EdiError::Xml("document has no root element".to_string()))
}

/// Name of the document's root element
pub fn root_name(xml: &str) -> Result<String> {
    if xml.trim().is_empty() {
        return Err(EdiError::InvalidXml("XML document is empty".to_string()));
    }
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                return Ok(String::from_utf8_lossy(e.name().as_ref()).into_owned())
            }
            Event::Eof => {
                return Err(EdiError::Xml("document has no root element".to_string()))
            }
            _ => {}
        }
    }
}

struct Frame {
    name: String,
    children: Map<String, Value>,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self> {
        let mut children = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = format!(
                "{ATTRIBUTE_PREFIX}{}",
                String::from_utf8_lossy(attr.key.as_ref())
            );
            children.insert(key, Value::String(attr.unescape_value()?.into_owned()));
        }
        Ok(Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            children,
            text: String::new(),
        })
    }

    fn into_value(self) -> (String, Value) {
        let value = if self.children.is_empty() {
            if self.text.is_empty() {
                Value::Null
            } else {
                Value::String(self.text)
            }
        } else {
            let mut children = self.children;
            if !self.text.is_empty() {
                children.insert(TEXT_KEY.to_string(), Value::String(self.text));
            }
            Value::Object(children)
        };
        (self.name, value)
    }
}

fn close_frame(frame: Frame, stack: &mut [Frame], root: &mut Option<Value>) -> Result<()> {
    let (name, value) = frame.into_value();
    match stack.last_mut() {
        Some(parent) => {
            append_child(&mut parent.children, name, value);
            Ok(())
        }
        None => {
            if root.is_some() {
                return Err(EdiError::Xml("document has more than one root".to_string()));
            }
            let mut map = Map::new();
            map.insert(name, value);
            *root = Some(Value::Object(map));
            Ok(())
        }
    }
}

fn append_child(children: &mut Map<String, Value>, name: String, value: Value) {
    match children.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            children.insert(name, value);
        }
    }
}

fn encode_compact(tree: &Value, root_name: &str) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_node(&mut writer, root_name, tree)?;
    String::from_utf8(writer.into_inner()).map_err(|e| EdiError::Xml(e.to_string()))
}

fn write_node(writer: &mut Writer<Vec<u8>>, name: &str, value: &Value) -> Result<()> {
    match value {
        Value::Array(items) => {
            for item in items {
                write_node(writer, name, item)?;
            }
        }
        Value::Null | Value::Bool(_) => {
            writer.write_event(Event::Empty(BytesStart::new(name)))?;
        }
        Value::String(s) => write_text_element(writer, BytesStart::new(name), s)?,
        Value::Number(n) => write_text_element(writer, BytesStart::new(name), &n.to_string())?,
        Value::Object(map) => {
            let mut start = BytesStart::new(name);
            let mut text: Option<String> = None;
            let mut children = Vec::new();

            for (key, child) in map {
                if let Some(attr) = key.strip_prefix(ATTRIBUTE_PREFIX) {
                    start.push_attribute((attr, scalar_text(child).as_str()));
                } else if key == TEXT_KEY {
                    text = Some(scalar_text(child));
                } else {
                    children.push((key, child));
                }
            }

            if children.is_empty() && text.as_deref().map_or(true, str::is_empty) {
                writer.write_event(Event::Empty(start))?;
                return Ok(());
            }

            writer.write_event(Event::Start(start))?;
            if let Some(text) = text.filter(|t| !t.is_empty()) {
                writer.write_event(Event::Text(BytesText::new(&text)))?;
            }
            for (key, child) in children {
                write_node(writer, key, child)?;
            }
            writer.write_event(Event::End(BytesEnd::new(name)))?;
        }
    }
    Ok(())
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, start: BytesStart<'_>, text: &str) -> Result<()> {
    let end = BytesEnd::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(end))?;
    Ok(())
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn reindent(compact: &str) -> Result<String> {
    let mut reader = Reader::from_str(compact);
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    loop {
        match reader.read_event()? {
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }
    String::from_utf8(writer.into_inner()).map_err(|e| EdiError::Xml(e.to_string()))
}
