use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::model::{
    lookup_path, Document, FilterCondition, FilterQuery, SortDirection, SortKey, ID_FIELD,
};

/// In-process evaluation of filter, sort and projection over documents.
pub struct DocumentFilterEvaluator;

impl DocumentFilterEvaluator {
    /// True when the document satisfies every query in `conditions`.
    pub fn matches_all(document: &Document, conditions: &[FilterQuery]) -> bool {
        conditions
            .iter()
            .all(|query| Self::matches(document, query))
    }

    pub fn matches(document: &Document, query: &FilterQuery) -> bool {
        query.iter().all(|(field, condition)| {
            let value = lookup_path(document, field);
            match condition {
                FilterCondition::Equals(raw) => Self::equals(value, raw),
                FilterCondition::Range(bounds) => bounds.iter().all(|(op, bound)| {
                    Self::as_number(value).map_or(false, |n| op.holds(n, *bound))
                }),
            }
        })
    }

    /// Match a raw query string against a stored value, casting it to the
    /// stored value's type. Arrays match when any top-level element does.
    fn equals(value: Option<&Value>, raw: &str) -> bool {
        match value {
            Some(Value::Array(items)) => items.iter().any(|item| Self::equals_scalar(item, raw)),
            Some(value) => Self::equals_scalar(value, raw),
            None => false,
        }
    }

    fn equals_scalar(value: &Value, raw: &str) -> bool {
        match value {
            Value::String(s) => s == raw,
            Value::Number(n) => match (n.as_f64(), raw.trim().parse::<f64>()) {
                (Some(stored), Ok(wanted)) => stored == wanted,
                _ => false,
            },
            Value::Bool(b) => raw.parse::<bool>().map_or(false, |wanted| *b == wanted),
            Value::Null | Value::Array(_) | Value::Object(_) => false,
        }
    }

    /// Numeric reading of a stored value; numeric strings count.
    fn as_number(value: Option<&Value>) -> Option<f64> {
        match value? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Order two documents by the given sort keys; ties keep their order.
    pub fn compare(a: &Document, b: &Document, sort: &[SortKey]) -> Ordering {
        for key in sort {
            let ordering = Self::compare_values(
                lookup_path(a, &key.field),
                lookup_path(b, &key.field),
            );
            let ordering = match key.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Ascending type order of jsonb: missing, null, strings, numbers, booleans,
    /// arrays, objects. Arrays and objects compare equal among themselves.
    pub fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
        fn rank(value: Option<&Value>) -> u8 {
            match value {
                None => 0,
                Some(Value::Null) => 1,
                Some(Value::String(_)) => 2,
                Some(Value::Number(_)) => 3,
                Some(Value::Bool(_)) => 4,
                Some(Value::Array(_)) => 5,
                Some(Value::Object(_)) => 6,
            }
        }

        match (left, right) {
            (Some(Value::Number(l)), Some(Value::Number(r))) => {
                let (l, r) = (l.as_f64().unwrap_or(0.0), r.as_f64().unwrap_or(0.0));
                l.partial_cmp(&r).unwrap_or(Ordering::Equal)
            }
            (Some(Value::String(l)), Some(Value::String(r))) => l.cmp(r),
            (Some(Value::Bool(l)), Some(Value::Bool(r))) => l.cmp(r),
            _ => rank(left).cmp(&rank(right)),
        }
    }

    /// Restrict a document to `fields` (dotted paths allowed); `_id` always stays.
    /// An empty field list leaves the document whole.
    pub fn project(document: Document, fields: &[String]) -> Document {
        if fields.is_empty() {
            return document;
        }

        let mut projected = Map::new();
        if let Some(id) = document.get(ID_FIELD) {
            projected.insert(ID_FIELD.to_string(), id.clone());
        }
        for field in fields {
            if let Some(value) = lookup_path(&document, field) {
                insert_path(&mut projected, field, value.clone());
            }
        }
        projected
    }
}

fn insert_path(target: &mut Document, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            target.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = target
                .entry(head)
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(child) = entry {
                insert_path(child, rest, value);
            }
        }
    }
}
