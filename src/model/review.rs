use serde_json::Value;

use crate::logic::rating;
use crate::model::{Collection, Document, Resource, ValidationErrors, Validator, WriteEvent, WriteMode};
use crate::store::traits::{DocumentStore, StoreError};

pub struct Review;

#[async_trait::async_trait]
impl Resource for Review {
    const COLLECTION: Collection = Collection::Reviews;
    const SINGULAR: &'static str = "review";
    const PLURAL: &'static str = "reviews";
    const POPULATION: Option<&'static [&'static str]> = Some(&["room", "user"]);
    const FIELDS: &'static [&'static str] = &["review", "rating", "user", "room"];
    const TIMESTAMPS: bool = true;

    fn validate(document: &Document, mode: WriteMode) -> Result<(), ValidationErrors> {
        Validator::new(document, mode)
            .required("review", "A review must contain text")
            .required("rating", "Rating is required")
            .number("rating")
            .max("rating", 5.0, "Max average is 5")
            .min("rating", 1.0, "Min average is 1")
            .required("user", "A review must have a user")
            .required("room", "A review must have a room")
            .finish()
    }

    /// Keeps the reviewed room's aggregate rating current. A review moved to
    /// another room refreshes both rooms.
    async fn after_write<S>(store: &S, event: WriteEvent<'_>) -> Result<(), StoreError>
    where
        S: DocumentStore + ?Sized,
    {
        let review = event.document();
        let room_id = review.get("room").and_then(Value::as_str);
        let previous_room_id = event
            .previous()
            .and_then(|before| before.get("room"))
            .and_then(Value::as_str)
            .filter(|previous| Some(*previous) != room_id);

        if let Some(previous_room_id) = previous_room_id {
            rating::recalculate_room_rating(store, previous_room_id).await?;
        }
        let Some(room_id) = room_id else {
            return Ok(());
        };
        rating::recalculate_room_rating(store, room_id).await?;

        if let WriteEvent::Created(_) = event {
            if let Some(user_id) = review.get("user").and_then(Value::as_str) {
                rating::mark_booking_reviewed(store, room_id, user_id).await?;
            }
        }

        Ok(())
    }
}
