use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::logic::{execute, populate_documents, resolve_with};
use crate::model::{
    prepare_write, Document, ExecutionResult, FilterQuery, QuerySpec, Resource, UploadedFile,
    WriteEvent, WriteMode,
};
use crate::store::traits::{DocumentStore, DocumentStoreExt};

pub const STATUS_SUCCESSFUL: &str = "successful";

/// A single-entry JSON object whose key is chosen at runtime.
#[derive(Debug)]
pub struct Keyed<T> {
    pub key: &'static str,
    pub value: T,
}

impl<T: Serialize> Serialize for Keyed<T> {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.key, &self.value)?;
        map.end()
    }
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub status: &'static str,
    pub results: usize,
    pub current_page: u64,
    pub last_page: u64,
    pub data: Keyed<Vec<Document>>,
}

impl ListResponse {
    pub fn new(plural: &'static str, result: ExecutionResult) -> Self {
        Self {
            status: STATUS_SUCCESSFUL,
            results: result.documents.len(),
            current_page: result.current_page(),
            last_page: result.last_page(),
            data: Keyed {
                key: plural,
                value: result.documents,
            },
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct DocumentResponse {
    pub status: &'static str,
    pub data: Keyed<Document>,
}

impl DocumentResponse {
    pub fn new(singular: &'static str, document: Document) -> Self {
        Self {
            status: STATUS_SUCCESSFUL,
            data: Keyed {
                key: singular,
                value: document,
            },
        }
    }
}

/// List, get-one, create, update and delete for one resource type.
pub struct ResourceHandlers<R: Resource>(PhantomData<R>);

impl<R: Resource> ResourceHandlers<R> {
    pub async fn list_documents<S>(store: &S, spec: &QuerySpec) -> Result<ListResponse, ApiError>
    where
        S: DocumentStore + ?Sized,
    {
        let result = execute(store, R::COLLECTION, spec, R::POPULATION).await?;
        log::debug!("Listed {} {}", result.documents.len(), R::PLURAL);
        Ok(ListResponse::new(R::PLURAL, result))
    }

    /// Look a document up by `_id`, or by slug when `as=slug`.
    /// Only population applies here; other query parameters are ignored.
    pub async fn find_document<S>(
        store: &S,
        id: &str,
        spec: &QuerySpec,
    ) -> Result<Document, ApiError>
    where
        S: DocumentStore + ?Sized,
    {
        let found = if spec.get("as") == Some("slug") {
            store
                .find_one(R::COLLECTION, FilterQuery::equals("slug", id))
                .await?
        } else {
            store.find_by_id(R::COLLECTION, id).await?
        };
        let document = found.ok_or(ApiError::NotFound)?;

        let instructions = match (R::POPULATION, spec.with()) {
            (Some(whitelist), Some(with)) => resolve_with(with, whitelist),
            _ => Vec::new(),
        };
        let mut documents = [document];
        populate_documents(store, R::COLLECTION, &mut documents, &instructions).await?;
        let [document] = documents;

        Ok(document)
    }

    pub async fn create_document<S>(
        store: &S,
        mut body: Document,
        upload: &UploadedFile,
    ) -> Result<Document, ApiError>
    where
        S: DocumentStore + ?Sized,
    {
        apply_upload(&mut body, upload);
        let document = prepare_write::<R>(body, WriteMode::Create)?;

        let created = store.insert(R::COLLECTION, document).await?;
        R::after_write(store, WriteEvent::Created(&created)).await?;

        log::info!("Created {} {}", R::SINGULAR, document_label(&created));
        Ok(created)
    }

    pub async fn update_document<S>(
        store: &S,
        id: &str,
        mut body: Document,
        upload: &UploadedFile,
    ) -> Result<Document, ApiError>
    where
        S: DocumentStore + ?Sized,
    {
        apply_upload(&mut body, upload);
        let changes = prepare_write::<R>(body, WriteMode::Update)?;

        let before = store
            .find_by_id(R::COLLECTION, id)
            .await?
            .ok_or(ApiError::NotFound)?;
        let updated = store
            .update_by_id(R::COLLECTION, id, changes)
            .await?
            .ok_or(ApiError::NotFound)?;
        R::after_write(
            store,
            WriteEvent::Updated {
                before: &before,
                after: &updated,
            },
        )
        .await?;

        log::info!("Updated {} {}", R::SINGULAR, id);
        Ok(updated)
    }

    pub async fn delete_document<S>(store: &S, id: &str) -> Result<(), ApiError>
    where
        S: DocumentStore + ?Sized,
    {
        let removed = store
            .delete_by_id(R::COLLECTION, id)
            .await?
            .ok_or(ApiError::NotFound)?;
        R::after_write(store, WriteEvent::Deleted(&removed)).await?;

        log::info!("Deleted {} {}", R::SINGULAR, id);
        Ok(())
    }

    pub async fn list<S: DocumentStore + 'static>(
        State(store): State<Arc<S>>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Result<Json<ListResponse>, ApiError> {
        let spec = QuerySpec::new(params);
        Ok(Json(Self::list_documents(&*store, &spec).await?))
    }

    pub async fn get_one<S: DocumentStore + 'static>(
        State(store): State<Arc<S>>,
        Path(id): Path<String>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Result<Json<DocumentResponse>, ApiError> {
        let spec = QuerySpec::new(params);
        let document = Self::find_document(&*store, &id, &spec).await?;
        Ok(Json(DocumentResponse::new(R::SINGULAR, document)))
    }

    pub async fn create<S: DocumentStore + 'static>(
        State(store): State<Arc<S>>,
        upload: UploadedFile,
        Json(body): Json<Document>,
    ) -> Result<(StatusCode, Json<DocumentResponse>), ApiError> {
        let created = Self::create_document(&*store, body, &upload).await?;
        Ok((
            StatusCode::CREATED,
            Json(DocumentResponse::new(R::SINGULAR, created)),
        ))
    }

    pub async fn update<S: DocumentStore + 'static>(
        State(store): State<Arc<S>>,
        Path(id): Path<String>,
        upload: UploadedFile,
        Json(body): Json<Document>,
    ) -> Result<(StatusCode, Json<DocumentResponse>), ApiError> {
        let updated = Self::update_document(&*store, &id, body, &upload).await?;
        Ok((
            StatusCode::CREATED,
            Json(DocumentResponse::new(R::SINGULAR, updated)),
        ))
    }

    pub async fn delete<S: DocumentStore + 'static>(
        State(store): State<Arc<S>>,
        Path(id): Path<String>,
    ) -> Result<StatusCode, ApiError> {
        Self::delete_document(&*store, &id).await?;
        Ok(StatusCode::NO_CONTENT)
    }
}

/// Every write carries `image`: the uploaded file's name, or empty.
fn apply_upload(body: &mut Document, upload: &UploadedFile) {
    let image = upload.filename().unwrap_or_default().to_string();
    body.insert("image".to_string(), serde_json::Value::String(image));
}

fn document_label(document: &Document) -> &str {
    crate::model::document_id(document).unwrap_or("<unassigned>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Booking, Collection, Review, Room, User, WEEKDAYS};
    use crate::store::{MemoryStore, StoreError};
    use serde_json::{json, Value};

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn room_body(name: &str) -> Document {
        let availability: serde_json::Map<String, Value> = WEEKDAYS
            .iter()
            .map(|day| (day.to_string(), json!({"from": "09:00", "to": "17:00", "on": true})))
            .collect();
        doc(json!({
            "name": name,
            "area": 40,
            "maxSize": 8,
            "pricePerHour": 60,
            "location": {"coordinates": [31.2, 30.0]},
            "availability": availability
        }))
    }

    #[test]
    fn test_envelopes_use_resource_keys() {
        let single = DocumentResponse::new("room", doc(json!({"_id": "r1"})));
        assert_eq!(
            serde_json::to_value(&single).unwrap(),
            json!({"status": "successful", "data": {"room": {"_id": "r1"}}})
        );

        let list = ListResponse::new(
            "rooms",
            ExecutionResult {
                documents: vec![doc(json!({"_id": "r1"}))],
                total_count: Some(1),
                pagination: Default::default(),
            },
        );
        assert_eq!(
            serde_json::to_value(&list).unwrap(),
            json!({
                "status": "successful",
                "results": 1,
                "currentPage": 1,
                "lastPage": 1,
                "data": {"rooms": [{"_id": "r1"}]}
            })
        );
    }

    #[tokio::test]
    async fn test_create_sets_image_from_upload() {
        let store = MemoryStore::new();
        let upload = UploadedFile(Some("room-1.jpg".to_string()));

        let room = ResourceHandlers::<Room>::create_document(&store, room_body("Loft"), &upload)
            .await
            .unwrap();
        assert_eq!(room["image"], "room-1.jpg");
        assert_eq!(room["slug"], "loft");

        let id = room["_id"].as_str().unwrap();
        let updated = ResourceHandlers::<Room>::update_document(
            &store,
            id,
            doc(json!({"floor": 3})),
            &UploadedFile::default(),
        )
        .await
        .unwrap();
        assert_eq!(updated["image"], "");
        assert_eq!(updated["floor"], 3);
        assert_eq!(updated["name"], "Loft");
    }

    #[tokio::test]
    async fn test_create_reports_validation_and_duplicates() {
        let store = MemoryStore::new();
        let upload = UploadedFile::default();

        let invalid =
            ResourceHandlers::<Room>::create_document(&store, doc(json!({"area": 3})), &upload)
                .await
                .unwrap_err();
        assert!(matches!(invalid, ApiError::Validation(_)));
        assert!(invalid.to_string().starts_with("Invalid input data. "));

        ResourceHandlers::<Room>::create_document(&store, room_body("Loft"), &upload)
            .await
            .unwrap();
        let duplicate = ResourceHandlers::<Room>::create_document(&store, room_body("Loft"), &upload)
            .await
            .unwrap_err();
        assert!(matches!(
            duplicate,
            ApiError::Store(StoreError::Duplicate { .. })
        ));
    }

    #[tokio::test]
    async fn test_find_by_slug_with_population() {
        let store = MemoryStore::new();
        let upload = UploadedFile::default();
        let room = ResourceHandlers::<Room>::create_document(&store, room_body("Blue Room"), &upload)
            .await
            .unwrap();
        let room_id = room["_id"].as_str().unwrap().to_string();
        store
            .insert(
                Collection::Reviews,
                doc(json!({"review": "quiet", "rating": 4, "room": room_id, "user": "u1"})),
            )
            .await
            .unwrap();

        let spec = QuerySpec::from_pairs([("as", "slug"), ("with", "reviews")]);
        let found = ResourceHandlers::<Room>::find_document(&store, "blue-room", &spec)
            .await
            .unwrap();
        assert_eq!(found["_id"], room_id.as_str());
        assert_eq!(found["reviews"].as_array().unwrap().len(), 1);

        let missing = ResourceHandlers::<Room>::find_document(&store, "blue-room", &QuerySpec::default())
            .await
            .unwrap_err();
        assert!(matches!(missing, ApiError::NotFound));
    }

    #[tokio::test]
    async fn test_review_writes_keep_room_rating_current() {
        let store = MemoryStore::new();
        let upload = UploadedFile::default();
        let room = ResourceHandlers::<Room>::create_document(&store, room_body("Loft"), &upload)
            .await
            .unwrap();
        let room_id = room["_id"].as_str().unwrap().to_string();
        let booking = ResourceHandlers::<Booking>::create_document(
            &store,
            doc(json!({
                "room": room_id,
                "user": "u1",
                "day": "2024-03-01",
                "from": "10:00",
                "to": "12:00",
                "pricePerHour": 60
            })),
            &upload,
        )
        .await
        .unwrap();

        let review = ResourceHandlers::<Review>::create_document(
            &store,
            doc(json!({"review": "fine", "rating": 3, "room": room_id, "user": "u1"})),
            &upload,
        )
        .await
        .unwrap();

        let rated = store.find_by_id(Collection::Rooms, &room_id).await.unwrap().unwrap();
        assert_eq!(rated["rating"], json!(3.0));
        assert_eq!(rated["ratingsQuantity"], json!(1));
        let reviewed = store
            .find_by_id(Collection::Bookings, booking["_id"].as_str().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reviewed["isReviewed"], true);

        ResourceHandlers::<Review>::delete_document(&store, review["_id"].as_str().unwrap())
            .await
            .unwrap();
        let reset = store.find_by_id(Collection::Rooms, &room_id).await.unwrap().unwrap();
        assert_eq!(reset["rating"], json!(5.0));
        assert_eq!(reset["ratingsQuantity"], json!(0));
    }

    #[tokio::test]
    async fn test_delete_and_update_missing_documents() {
        let store = MemoryStore::new();
        let missing = ResourceHandlers::<User>::delete_document(&store, "nope")
            .await
            .unwrap_err();
        assert!(matches!(missing, ApiError::NotFound));

        let missing = ResourceHandlers::<User>::update_document(
            &store,
            "nope",
            doc(json!({"name": "Ann"})),
            &UploadedFile::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(missing, ApiError::NotFound));
    }

    #[tokio::test]
    async fn test_moving_review_refreshes_both_rooms() {
        let store = MemoryStore::new();
        let upload = UploadedFile::default();
        let mut room_ids = Vec::new();
        for name in ["Attic", "Basement"] {
            let room = ResourceHandlers::<Room>::create_document(&store, room_body(name), &upload)
                .await
                .unwrap();
            room_ids.push(room["_id"].as_str().unwrap().to_string());
        }
        let (attic, basement) = (&room_ids[0], &room_ids[1]);

        let review = ResourceHandlers::<Review>::create_document(
            &store,
            doc(json!({"review": "damp", "rating": 1, "room": attic, "user": "u1"})),
            &upload,
        )
        .await
        .unwrap();
        let rated = store.find_by_id(Collection::Rooms, attic).await.unwrap().unwrap();
        assert_eq!(rated["rating"], json!(1.0));

        ResourceHandlers::<Review>::update_document(
            &store,
            review["_id"].as_str().unwrap(),
            doc(json!({"room": basement})),
            &upload,
        )
        .await
        .unwrap();

        let attic = store.find_by_id(Collection::Rooms, attic).await.unwrap().unwrap();
        assert_eq!(attic["rating"], json!(5.0));
        assert_eq!(attic["ratingsQuantity"], json!(0));
        let basement = store.find_by_id(Collection::Rooms, basement).await.unwrap().unwrap();
        assert_eq!(basement["rating"], json!(1.0));
        assert_eq!(basement["ratingsQuantity"], json!(1));
    }

    #[tokio::test]
    async fn test_get_one_ignores_list_parameters() {
        let store = MemoryStore::new();
        let upload = UploadedFile::default();
        let room = ResourceHandlers::<Room>::create_document(&store, room_body("Loft"), &upload)
            .await
            .unwrap();
        let room_id = room["_id"].as_str().unwrap().to_string();
        store
            .insert(
                Collection::Reviews,
                doc(json!({"review": "bright", "rating": 5, "room": room_id, "user": "u1"})),
            )
            .await
            .unwrap();

        let spec = QuerySpec::from_pairs([
            ("where", "pricePerHour>1000"),
            ("sort", "-name"),
            ("fields", "name"),
            ("limit", "0"),
            ("page", "7"),
            ("with", "reviews"),
        ]);
        let found = ResourceHandlers::<Room>::find_document(&store, &room_id, &spec)
            .await
            .unwrap();

        assert_eq!(found["pricePerHour"], 60);
        assert_eq!(found["slug"], "loft");
        assert!(found.contains_key("availability"));
        assert_eq!(found["reviews"].as_array().unwrap().len(), 1);
    }
}
