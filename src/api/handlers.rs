use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::api::resource_handlers::{DocumentResponse, ListResponse, ResourceHandlers};
use crate::model::{
    parse_day, Booking, Collection, Document, FilterQuery, FindOptions, QuerySpec, Resource, Review,
    SortKey, UploadedFile, UserContext,
};
use crate::store::traits::DocumentStore;

pub type AppState<S> = Arc<S>;

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Fallback for every unmatched path, reported with the path as requested.
pub async fn route_not_found(OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::RouteNotFound(uri.to_string())
}

/// Create a review authored by the caller, whatever `user` the body names.
pub async fn create_review<S: DocumentStore + 'static>(
    State(store): State<AppState<S>>,
    user: UserContext,
    upload: UploadedFile,
    Json(mut body): Json<Document>,
) -> Result<(StatusCode, Json<DocumentResponse>), ApiError> {
    body.insert("user".to_string(), Value::String(user.user_id));
    let review = ResourceHandlers::<Review>::create_document(&*store, body, &upload).await?;
    Ok((
        StatusCode::CREATED,
        Json(DocumentResponse::new(Review::SINGULAR, review)),
    ))
}

/// The caller's bookings with their rooms, through the regular list pipeline.
pub async fn my_bookings<S: DocumentStore + 'static>(
    State(store): State<AppState<S>>,
    user: UserContext,
    Query(mut params): Query<HashMap<String, String>>,
) -> Result<Json<ListResponse>, ApiError> {
    params
        .entry("with".to_string())
        .or_insert_with(|| "room".to_string());
    let spec = QuerySpec::new(params).with_special_filter(FilterQuery::equals("user", user.user_id));

    Ok(Json(
        ResourceHandlers::<Booking>::list_documents(&*store, &spec).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct RoomDayRequest {
    pub day: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BookedSlot {
    pub day: Value,
    pub from: Value,
    pub to: Value,
}

#[derive(Debug, Serialize)]
pub struct RoomDayBookingsData {
    pub bookings: Vec<BookedSlot>,
}

#[derive(Debug, Serialize)]
pub struct RoomDayBookingsResponse {
    pub message: &'static str,
    pub data: RoomDayBookingsData,
}

/// Time slots already booked for a room on one day.
pub async fn room_day_bookings<S: DocumentStore + 'static>(
    State(store): State<AppState<S>>,
    Path(room_id): Path<String>,
    Json(request): Json<RoomDayRequest>,
) -> Result<Json<RoomDayBookingsResponse>, ApiError> {
    let day = request
        .day
        .as_deref()
        .filter(|day| day.len() == 10)
        .and_then(parse_day)
        .ok_or_else(|| {
            ApiError::BadRequest(
                "Please provide the required booking date in format of yyyy-mm-dd as following 2022-01-20"
                    .to_string(),
            )
        })?;

    let options = FindOptions {
        sort: vec![SortKey::parse("from")],
        ..FindOptions::matching(
            FilterQuery::equals("room", room_id)
                .and_equals("day", day.format("%Y-%m-%d").to_string()),
        )
    };
    let bookings = store.find(Collection::Bookings, &options).await?;

    let field = |booking: &Document, name: &str| booking.get(name).cloned().unwrap_or(Value::Null);
    Ok(Json(RoomDayBookingsResponse {
        message: "successful",
        data: RoomDayBookingsData {
            bookings: bookings
                .iter()
                .map(|booking| BookedSlot {
                    day: field(booking, "day"),
                    from: field(booking, "from"),
                    to: field(booking, "to"),
                })
                .collect(),
        },
    }))
}
