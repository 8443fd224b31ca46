//! Path operations on value trees
//!
//! Schema lines address values by slash-delimited element paths. These helpers read and
//! build trees along such paths.

use crate::domain::schema::split_path;
use crate::domain::{EdiError, Result};
use serde_json::{Map, Value};

/// Resolves a slash path inside a tree
///
/// Returns `None` as soon as a segment is missing or a non-object is reached. A `null`
/// leaf is returned as `Some(Value::Null)`.
pub fn get_path<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = tree;
    for segment in split_path(path) {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Inserts `value` at a slash path, creating intermediate objects
///
/// # Errors
///
/// Returns a data-mapping error when an intermediate segment already holds a
/// non-object value.
pub fn insert_path(tree: &mut Map<String, Value>, path: &str, value: Value) -> Result<()> {
    let segments = split_path(path);
    let Some((last, parents)) = segments.split_last() else {
        return Err(EdiError::DataMapping("Empty XML element path".to_string()));
    };

    let mut current = tree;
    for segment in parents {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if entry.is_null() {
            *entry = Value::Object(Map::new());
        }
        current = entry.as_object_mut().ok_or_else(|| {
            EdiError::DataMapping(format!(
                "Cannot nest '{path}': element '{segment}' already holds a value"
            ))
        })?;
    }
    current.insert(last.to_string(), value);
    Ok(())
}

/// Wraps `value` under each header segment, outermost first
pub fn wrap_under(value: Value, segments: &[&str]) -> Value {
    segments.iter().rev().fold(value, |inner, segment| {
        let mut map = Map::new();
        map.insert(segment.to_string(), inner);
        Value::Object(map)
    })
}

/// Descends through header segments, stopping at the first one that is missing
pub fn strip_header(tree: Value, segments: &[&str]) -> Value {
    let mut current = tree;
    for segment in segments {
        match current {
            Value::Object(mut map) if map.contains_key(*segment) => {
                current = map.remove(*segment).unwrap_or(Value::Null);
            }
            other => return other,
        }
    }
    current
}

/// Promotes a scalar or object to a one-element list; `null` becomes empty
pub fn as_list(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_path() {
        let tree = json!({"Address": {"City": "Berlin", "Zip": null}});
        assert_eq!(get_path(&tree, "Address/City"), Some(&json!("Berlin")));
        assert_eq!(get_path(&tree, "Address/Zip"), Some(&Value::Null));
        assert_eq!(get_path(&tree, "Address/Street"), None);
        assert_eq!(get_path(&tree, "Address/City/Part"), None);
    }

    #[test]
    fn test_insert_path_creates_levels() {
        let mut tree = Map::new();
        insert_path(&mut tree, "Address/City", json!("Berlin")).unwrap();
        insert_path(&mut tree, "Address/Zip", json!("10115")).unwrap();
        assert_eq!(
            Value::Object(tree),
            json!({"Address": {"City": "Berlin", "Zip": "10115"}})
        );
    }

    #[test]
    fn test_insert_path_through_scalar_fails() {
        let mut tree = Map::new();
        insert_path(&mut tree, "Name", json!("Acme")).unwrap();
        let err = insert_path(&mut tree, "Name/First", json!("x")).unwrap_err();
        assert!(matches!(err, EdiError::DataMapping(_)));
    }

    #[test]
    fn test_wrap_and_strip_header() {
        let wrapped = wrap_under(json!({"Name": "Acme"}), &["Partners", "Partner"]);
        assert_eq!(wrapped, json!({"Partners": {"Partner": {"Name": "Acme"}}}));
        assert_eq!(
            strip_header(wrapped.clone(), &["Partners", "Partner"]),
            json!({"Name": "Acme"})
        );
        assert_eq!(
            strip_header(wrapped, &["Partners", "Other"]),
            json!({"Partner": {"Name": "Acme"}})
        );
    }

    #[test]
    fn test_as_list() {
        assert_eq!(as_list(&json!([1, 2])).len(), 2);
        assert_eq!(as_list(&json!({"a": 1})).len(), 1);
        assert!(as_list(&Value::Null).is_empty());
    }
}
