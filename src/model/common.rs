use serde_json::{Map, Value};
use uuid::Uuid;

pub type Id = String;

/// A stored document: a JSON object keyed by attribute name.
pub type Document = Map<String, Value>;

/// Primary identifier attribute carried by every stored document.
pub const ID_FIELD: &str = "_id";

pub fn generate_id() -> Id {
    Uuid::new_v4().simple().to_string()
}

/// Read the primary identifier of a document, if it has one.
pub fn document_id(document: &Document) -> Option<&str> {
    document.get(ID_FIELD).and_then(Value::as_str)
}

/// Resolve a dotted attribute path (`location.type`) against a document.
pub fn lookup_path<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = document.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Render a scalar JSON value the way a reference key is compared.
pub fn value_as_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
