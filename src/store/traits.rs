use crate::model::{Collection, Document, FilterQuery, FindOptions, Id};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique attribute already holds this value in the collection.
    #[error("{field} with value \"{value}\" already exists.")]
    Duplicate { field: String, value: String },

    /// The store rejected the query expression itself.
    #[error("{0}")]
    InvalidQuery(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Schema-agnostic access to the document collections.
///
/// Reads never return a collection's hidden fields.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(
        &self,
        collection: Collection,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError>;

    /// Documents whose `field` equals one of `values`, in store order.
    async fn find_where_in(
        &self,
        collection: Collection,
        field: &str,
        values: &[String],
    ) -> Result<Vec<Document>, StoreError>;

    async fn find_by_id(&self, collection: Collection, id: &str)
        -> Result<Option<Document>, StoreError>;

    /// Number of documents matching every condition.
    async fn estimated_count(
        &self,
        collection: Collection,
        conditions: &[FilterQuery],
    ) -> Result<u64, StoreError>;

    /// Store a new document, assigning its `_id`.
    async fn insert(&self, collection: Collection, document: Document)
        -> Result<Document, StoreError>;

    /// Merge `changes` into the document and return the updated version.
    async fn update_by_id(
        &self,
        collection: Collection,
        id: &str,
        changes: Document,
    ) -> Result<Option<Document>, StoreError>;

    /// Remove the document, returning what was removed.
    async fn delete_by_id(&self, collection: Collection, id: &str)
        -> Result<Option<Document>, StoreError>;
}

/// Convenience lookups shared by every backend.
#[async_trait::async_trait]
pub trait DocumentStoreExt: DocumentStore {
    async fn find_one(
        &self,
        collection: Collection,
        condition: FilterQuery,
    ) -> Result<Option<Document>, StoreError> {
        let options = FindOptions::matching(condition).first();
        Ok(self.find(collection, &options).await?.into_iter().next())
    }

    async fn find_by_ids(
        &self,
        collection: Collection,
        ids: &[Id],
    ) -> Result<Vec<Document>, StoreError> {
        self.find_where_in(collection, crate::model::ID_FIELD, ids).await
    }
}

impl<T: DocumentStore + ?Sized> DocumentStoreExt for T {}
