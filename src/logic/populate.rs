use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use itertools::Itertools;
use serde_json::Value;

use crate::model::{
    document_id, lookup_path, value_as_key, Collection, Document, PopulationInstruction,
    RelationKind,
};
use crate::store::traits::{DocumentStore, DocumentStoreExt, StoreError};

type PopulateFuture<'a> = Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>>;

/// Expand each instruction's relation on `documents` in place.
///
/// References are replaced by the target document, or `null` when the target no
/// longer exists. Inverse relations attach an array under the relation name.
pub async fn populate_documents<S>(
    store: &S,
    collection: Collection,
    documents: &mut [Document],
    instructions: &[PopulationInstruction],
) -> Result<(), StoreError>
where
    S: DocumentStore + ?Sized,
{
    for instruction in instructions {
        populate_relation(store, collection, documents, instruction).await?;
    }
    Ok(())
}

fn populate_relation<'a, S>(
    store: &'a S,
    collection: Collection,
    documents: &'a mut [Document],
    instruction: &'a PopulationInstruction,
) -> PopulateFuture<'a>
where
    S: DocumentStore + ?Sized,
{
    Box::pin(async move {
        if documents.is_empty() {
            return Ok(());
        }

        let relation = collection.relation(&instruction.path).ok_or_else(|| {
            StoreError::InvalidQuery(format!(
                "Cannot populate path `{}` of {collection}",
                instruction.path
            ))
        })?;

        match relation.kind {
            RelationKind::Reference { local_field } => {
                let ids: Vec<String> = documents
                    .iter()
                    .filter_map(|doc| doc.get(local_field).and_then(value_as_key))
                    .unique()
                    .collect();
                if ids.is_empty() {
                    return Ok(());
                }

                let mut targets = store.find_by_ids(relation.target, &ids).await?;
                if let Some(child) = instruction.populate.as_deref() {
                    populate_relation(store, relation.target, &mut targets, child).await?;
                }

                let by_id: HashMap<String, Document> = targets
                    .into_iter()
                    .filter_map(|target| {
                        let id = document_id(&target)?.to_string();
                        Some((id, target))
                    })
                    .collect();

                for document in documents.iter_mut() {
                    let Some(id) = document.get(local_field).and_then(value_as_key) else {
                        continue;
                    };
                    let populated = by_id
                        .get(&id)
                        .cloned()
                        .map_or(Value::Null, Value::Object);
                    document.insert(local_field.to_string(), populated);
                }
            }
            RelationKind::Inverse { foreign_field } => {
                let ids: Vec<String> = documents
                    .iter()
                    .filter_map(|doc| document_id(doc).map(str::to_string))
                    .collect();

                let mut targets = store
                    .find_where_in(relation.target, foreign_field, &ids)
                    .await?;
                // Group keys are read before a nested expansion can replace the field.
                let keys: Vec<Option<String>> = targets
                    .iter()
                    .map(|target| lookup_path(target, foreign_field).and_then(value_as_key))
                    .collect();
                if let Some(child) = instruction.populate.as_deref() {
                    populate_relation(store, relation.target, &mut targets, child).await?;
                }

                let mut grouped: HashMap<String, Vec<Value>> = HashMap::new();
                for (key, target) in keys.into_iter().zip(targets) {
                    if let Some(key) = key {
                        grouped.entry(key).or_default().push(Value::Object(target));
                    }
                }

                for document in documents.iter_mut() {
                    let related = document_id(document)
                        .and_then(|id| grouped.get(id))
                        .cloned()
                        .unwrap_or_default();
                    document.insert(relation.name.to_string(), Value::Array(related));
                }
            }
        }

        Ok(())
    })
}
