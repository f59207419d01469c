use serde_json::{json, Value};

use crate::model::{Collection, Document, FilterQuery};
use crate::store::traits::{DocumentStore, DocumentStoreExt, StoreError};

/// Rating a room carries while it has no reviews.
pub const DEFAULT_RATING: f64 = 5.0;

/// Recompute a room's `rating` average and `ratingsQuantity` from its reviews.
pub async fn recalculate_room_rating<S>(store: &S, room_id: &str) -> Result<(), StoreError>
where
    S: DocumentStore + ?Sized,
{
    let reviews = store
        .find_where_in(Collection::Reviews, "room", &[room_id.to_string()])
        .await?;
    let ratings: Vec<f64> = reviews
        .iter()
        .filter_map(|review| review.get("rating").and_then(Value::as_f64))
        .collect();

    let (average, quantity) = if ratings.is_empty() {
        (DEFAULT_RATING, 0)
    } else {
        (ratings.iter().sum::<f64>() / ratings.len() as f64, ratings.len())
    };

    let mut changes = Document::new();
    changes.insert("rating".to_string(), json!(average));
    changes.insert("ratingsQuantity".to_string(), json!(quantity));

    if store
        .update_by_id(Collection::Rooms, room_id, changes)
        .await?
        .is_none()
    {
        log::warn!("Reviewed room {room_id} no longer exists");
    }
    Ok(())
}

/// Flag the caller's booking of a room once they have reviewed it.
pub async fn mark_booking_reviewed<S>(
    store: &S,
    room_id: &str,
    user_id: &str,
) -> Result<(), StoreError>
where
    S: DocumentStore + ?Sized,
{
    let condition = FilterQuery::equals("room", room_id).and_equals("user", user_id);
    let Some(booking) = store.find_one(Collection::Bookings, condition).await? else {
        return Ok(());
    };
    let Some(booking_id) = booking.get("_id").and_then(Value::as_str) else {
        return Ok(());
    };

    let mut changes = Document::new();
    changes.insert("isReviewed".to_string(), Value::Bool(true));
    store
        .update_by_id(Collection::Bookings, booking_id, changes)
        .await?;
    Ok(())
}
