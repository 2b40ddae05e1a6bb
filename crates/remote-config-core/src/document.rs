//! Path lookup into config documents

use serde_json::Value;

/// Look up a dotted `path` in a document.
///
/// A key that literally contains the whole path wins over walking it, so
/// `{"a.b": 1}` answers `"a.b"`. Otherwise each segment selects an object
/// field, or an array element when the segment is an index. Any missing
/// segment yields `None`.
pub fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    if let Value::Object(map) = document
        && let Some(value) = map.get(path)
    {
        return Some(value);
    }

    let mut current = document;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Whether a document carries nothing worth serving
pub fn is_empty_document(document: &Value) -> bool {
    match document {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
