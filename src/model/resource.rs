use serde_json::Value;

use crate::model::{lookup_path, Collection, Document, ID_FIELD};
use crate::store::traits::{DocumentStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Update,
}

/// A completed write, handed to resources that keep derived data elsewhere.
#[derive(Debug, Clone, Copy)]
pub enum WriteEvent<'a> {
    Created(&'a Document),
    Updated {
        before: &'a Document,
        after: &'a Document,
    },
    Deleted(&'a Document),
}

impl<'a> WriteEvent<'a> {
    /// The document as it stands after the write; the removed one for deletes.
    pub fn document(&self) -> &'a Document {
        match *self {
            WriteEvent::Created(doc) | WriteEvent::Deleted(doc) => doc,
            WriteEvent::Updated { after, .. } => after,
        }
    }

    /// The stored version the write replaced, for updates.
    pub fn previous(&self) -> Option<&'a Document> {
        match *self {
            WriteEvent::Updated { before, .. } => Some(before),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<String>);

impl ValidationErrors {
    pub fn messages(&self) -> &[String] {
        &self.0
    }
}

/// An entity type exposed through the generic resource handlers.
#[async_trait::async_trait]
pub trait Resource: Send + Sync + 'static {
    const COLLECTION: Collection;
    /// Envelope key for a single document.
    const SINGULAR: &'static str;
    /// Envelope key for a document list.
    const PLURAL: &'static str;
    /// Relation paths callers may expand with `with`.
    const POPULATION: Option<&'static [&'static str]> = None;
    /// Attributes accepted on write; anything else is dropped.
    const FIELDS: &'static [&'static str];
    const TIMESTAMPS: bool = false;

    /// Defaults and normalized or derived attributes, before validation.
    fn prepare(_document: &mut Document, _mode: WriteMode) {}

    fn validate(document: &Document, mode: WriteMode) -> Result<(), ValidationErrors>;

    /// Last transformation before the document reaches the store.
    fn before_save(_document: &mut Document) -> Result<(), ValidationErrors> {
        Ok(())
    }

    async fn after_write<S>(_store: &S, _event: WriteEvent<'_>) -> Result<(), StoreError>
    where
        S: DocumentStore + ?Sized,
    {
        Ok(())
    }
}

/// Turn a caller-supplied attribute map into the document to store.
pub fn prepare_write<R: Resource>(
    body: Document,
    mode: WriteMode,
) -> Result<Document, ValidationErrors> {
    let mut document: Document = body
        .into_iter()
        .filter(|(key, _)| key != ID_FIELD && R::FIELDS.contains(&key.as_str()))
        .collect();

    R::prepare(&mut document, mode);
    R::validate(&document, mode)?;
    R::before_save(&mut document)?;

    if R::TIMESTAMPS {
        let now = Value::String(chrono::Utc::now().to_rfc3339());
        if mode == WriteMode::Create {
            document.insert("createdAt".to_string(), now.clone());
        }
        document.insert("updatedAt".to_string(), now);
    }

    Ok(document)
}

/// Collects schema violations the way the resource definitions declare them.
pub struct Validator<'a> {
    document: &'a Document,
    mode: WriteMode,
    errors: Vec<String>,
}

impl<'a> Validator<'a> {
    pub fn new(document: &'a Document, mode: WriteMode) -> Self {
        Self {
            document,
            mode,
            errors: Vec::new(),
        }
    }

    /// Updates only validate attributes they touch.
    fn applies(&self, field: &str) -> bool {
        let root = field.split('.').next().unwrap_or(field);
        self.mode == WriteMode::Create || self.document.contains_key(root)
    }

    fn value(&self, field: &str) -> Option<&'a Value> {
        lookup_path(self.document, field).filter(|value| !value.is_null())
    }

    pub fn required(mut self, field: &str, message: &str) -> Self {
        if self.applies(field) {
            let missing = match self.value(field) {
                None => true,
                Some(Value::String(s)) => s.is_empty(),
                Some(_) => false,
            };
            if missing {
                self.errors.push(message.to_string());
            }
        }
        self
    }

    /// Fails when a present value does not satisfy `predicate`.
    pub fn check(mut self, field: &str, message: &str, predicate: impl Fn(&Value) -> bool) -> Self {
        if let Some(value) = self.value(field) {
            if !predicate(value) {
                self.errors.push(message.to_string());
            }
        }
        self
    }

    pub fn number(self, field: &str) -> Self {
        let message = format!("Cast to Number failed for value at path \"{field}\"");
        self.check(field, &message, |value| value.is_number())
    }

    pub fn min(self, field: &str, min: f64, message: &str) -> Self {
        self.check(field, message, |value| value.as_f64().map_or(true, |n| n >= min))
    }

    pub fn max(self, field: &str, max: f64, message: &str) -> Self {
        self.check(field, message, |value| value.as_f64().map_or(true, |n| n <= max))
    }

    pub fn one_of(self, field: &str, allowed: &[&str]) -> Self {
        let message = format!("`{field}` must be one of: {}", allowed.join(", "));
        self.check(field, &message, |value| {
            value.as_str().map_or(false, |s| allowed.contains(&s))
        })
    }

    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(self.errors))
        }
    }
}

/// `HH:mm` on a 24 hour clock.
pub fn is_clock_time(value: &Value) -> bool {
    value.as_str().map_or(false, |time| {
        time.len() == 5 && chrono::NaiveTime::parse_from_str(time, "%H:%M").is_ok()
    })
}
