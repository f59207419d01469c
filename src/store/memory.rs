use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;

use crate::logic::document_filter::DocumentFilterEvaluator;
use crate::model::{
    document_id, generate_id, lookup_path, value_as_key, Collection, Document, FilterQuery,
    FindOptions, ID_FIELD,
};
use crate::store::traits::{DocumentStore, StoreError};

/// Process-local document store. Collections keep insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_fields<'a>(fields: impl IntoIterator<Item = &'a str>) -> Result<(), StoreError> {
        for field in fields {
            if field.is_empty() || field.split('.').any(str::is_empty) {
                return Err(StoreError::InvalidQuery(format!(
                    "Invalid field path \"{field}\""
                )));
            }
        }
        Ok(())
    }

    fn check_unique(
        documents: &[Document],
        collection: Collection,
        candidate: &Document,
        own_id: Option<&str>,
    ) -> Result<(), StoreError> {
        for field in collection.unique_fields() {
            let Some(value) = candidate.get(*field).filter(|v| !v.is_null()) else {
                continue;
            };
            let taken = documents
                .iter()
                .filter(|doc| document_id(doc) != own_id)
                .any(|doc| doc.get(*field) == Some(value));
            if taken {
                return Err(StoreError::Duplicate {
                    field: field.to_string(),
                    value: value_as_key(value).unwrap_or_else(|| value.to_string()),
                });
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn find(
        &self,
        collection: Collection,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        Self::check_fields(
            options
                .conditions
                .iter()
                .flat_map(|query| query.iter().map(|(field, _)| field.as_str()))
                .chain(options.sort.iter().map(|key| key.field.as_str())),
        )?;

        let collections = self.collections.read();
        let mut matched: Vec<&Document> = collections
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| DocumentFilterEvaluator::matches_all(doc, &options.conditions))
                    .collect()
            })
            .unwrap_or_default();

        if !options.sort.is_empty() {
            matched.sort_by(|a, b| DocumentFilterEvaluator::compare(a, b, &options.sort));
        }

        let limit = options.limit.map_or(usize::MAX, |n| n as usize);
        Ok(matched
            .into_iter()
            .skip(options.skip as usize)
            .take(limit)
            .map(|doc| collection.redact(doc.clone()))
            .collect())
    }

    async fn find_where_in(
        &self,
        collection: Collection,
        field: &str,
        values: &[String],
    ) -> Result<Vec<Document>, StoreError> {
        Self::check_fields([field])?;

        let collections = self.collections.read();
        Ok(collections
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| {
                        lookup_path(doc, field)
                            .and_then(value_as_key)
                            .map_or(false, |key| values.contains(&key))
                    })
                    .map(|doc| collection.redact(doc.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find_by_id(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read();
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|doc| document_id(doc) == Some(id)))
            .map(|doc| collection.redact(doc.clone())))
    }

    async fn estimated_count(
        &self,
        collection: Collection,
        conditions: &[FilterQuery],
    ) -> Result<u64, StoreError> {
        let collections = self.collections.read();
        Ok(collections.get(&collection).map_or(0, |docs| {
            docs.iter()
                .filter(|doc| DocumentFilterEvaluator::matches_all(doc, conditions))
                .count() as u64
        }))
    }

    async fn insert(
        &self,
        collection: Collection,
        mut document: Document,
    ) -> Result<Document, StoreError> {
        if document_id(&document).is_none() {
            document.insert(ID_FIELD.to_string(), Value::String(generate_id()));
        }

        let mut collections = self.collections.write();
        let docs = collections.entry(collection).or_default();
        Self::check_unique(docs, collection, &document, None)?;
        docs.push(document.clone());

        Ok(collection.redact(document))
    }

    async fn update_by_id(
        &self,
        collection: Collection,
        id: &str,
        changes: Document,
    ) -> Result<Option<Document>, StoreError> {
        let mut collections = self.collections.write();
        let docs = collections.entry(collection).or_default();
        let Some(position) = docs.iter().position(|doc| document_id(doc) == Some(id)) else {
            return Ok(None);
        };

        let mut updated = docs[position].clone();
        updated.extend(changes);
        Self::check_unique(docs, collection, &updated, Some(id))?;
        docs[position] = updated.clone();

        Ok(Some(collection.redact(updated)))
    }

    async fn delete_by_id(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let mut collections = self.collections.write();
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(None);
        };
        let removed = docs
            .iter()
            .position(|doc| document_id(doc) == Some(id))
            .map(|position| docs.remove(position));

        Ok(removed.map(|doc| collection.redact(doc)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::filter_parser::parse_filter;
    use crate::model::SortKey;
    use crate::store::traits::DocumentStoreExt;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_finds_by_id() {
        let store = MemoryStore::new();
        let room = store
            .insert(Collection::Rooms, doc(json!({"name": "Loft"})))
            .await
            .unwrap();
        let id = document_id(&room).unwrap().to_string();

        let found = store.find_by_id(Collection::Rooms, &id).await.unwrap();
        assert_eq!(found, Some(room));
        assert_eq!(store.find_by_id(Collection::Users, &id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_find_applies_conditions_sort_and_window() {
        let store = MemoryStore::new();
        for (name, price) in [("a", 40), ("b", 60), ("c", 80), ("d", 120)] {
            store
                .insert(Collection::Rooms, doc(json!({"name": name, "pricePerHour": price})))
                .await
                .unwrap();
        }

        let options = FindOptions {
            conditions: vec![parse_filter("pricePerHour>=50")],
            sort: vec![SortKey::parse("-pricePerHour")],
            skip: 1,
            limit: Some(1),
        };
        let found = store.find(Collection::Rooms, &options).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["name"], "c");

        let count = store
            .estimated_count(Collection::Rooms, &[parse_filter("pricePerHour>=50")])
            .await
            .unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn test_invalid_field_paths_are_rejected() {
        let store = MemoryStore::new();
        let options = FindOptions {
            sort: vec![SortKey::parse("-")],
            ..FindOptions::default()
        };
        let result = store.find(Collection::Rooms, &options).await;
        assert!(matches!(result, Err(StoreError::InvalidQuery(_))));
    }

    #[tokio::test]
    async fn test_unique_fields_are_enforced() {
        let store = MemoryStore::new();
        store
            .insert(Collection::Rooms, doc(json!({"name": "Loft"})))
            .await
            .unwrap();
        let err = store
            .insert(Collection::Rooms, doc(json!({"name": "Loft"})))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "name with value \"Loft\" already exists.");
    }

    #[tokio::test]
    async fn test_update_merges_and_delete_removes() {
        let store = MemoryStore::new();
        let room = store
            .insert(Collection::Rooms, doc(json!({"name": "Loft", "floor": 1})))
            .await
            .unwrap();
        let id = document_id(&room).unwrap().to_string();

        let updated = store
            .update_by_id(Collection::Rooms, &id, doc(json!({"floor": 2})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["name"], "Loft");
        assert_eq!(updated["floor"], 2);

        assert!(store.delete_by_id(Collection::Rooms, &id).await.unwrap().is_some());
        assert!(store.delete_by_id(Collection::Rooms, &id).await.unwrap().is_none());
        assert!(store
            .update_by_id(Collection::Rooms, &id, Document::new())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_hidden_fields_never_leave_the_store() {
        let store = MemoryStore::new();
        let user = store
            .insert(Collection::Users, doc(json!({"name": "Ann", "password": "digest"})))
            .await
            .unwrap();
        assert!(!user.contains_key("password"));

        let found = store
            .find_one(Collection::Users, FilterQuery::equals("name", "Ann"))
            .await
            .unwrap()
            .unwrap();
        assert!(!found.contains_key("password"));
    }

    #[tokio::test]
    async fn test_find_where_in() {
        let store = MemoryStore::new();
        for (text, room) in [("one", "r1"), ("two", "r2"), ("three", "r1")] {
            store
                .insert(Collection::Reviews, doc(json!({"review": text, "room": room})))
                .await
                .unwrap();
        }
        let found = store
            .find_where_in(Collection::Reviews, "room", &["r1".to_string()])
            .await
            .unwrap();
        let texts: Vec<&str> = found.iter().map(|d| d["review"].as_str().unwrap()).collect();
        assert_eq!(texts, vec!["one", "three"]);
    }
}
