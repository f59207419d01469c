use crate::model::{
    prepare_write, Document, FilterQuery, Resource, Room, User, WriteMode, WEEKDAYS,
};
use crate::store::traits::{DocumentStore, DocumentStoreExt};
use anyhow::{Context, Result};
use serde_json::{json, Map, Value};

/// Weekday opening hours shared by the demo rooms; weekends closed.
fn office_hours() -> Value {
    let days: Map<String, Value> = WEEKDAYS
        .iter()
        .map(|day| {
            let open = !matches!(*day, "friday" | "saturday");
            (
                day.to_string(),
                json!({"from": "09:00", "to": "17:00", "on": open}),
            )
        })
        .collect();
    Value::Object(days)
}

fn demo_rooms() -> Vec<Value> {
    vec![
        json!({
            "name": "Skyline Boardroom",
            "title": "Boardroom with a view over the river",
            "area": 60,
            "maxSize": 14,
            "pricePerHour": 95,
            "floor": 12,
            "location": {"coordinates": [31.2357, 30.0444]},
            "ammenities": ["projector", "whiteboard", "wifi"],
        }),
        json!({
            "name": "Quiet Study",
            "title": "Small room for focused work",
            "area": 12,
            "maxSize": 2,
            "pricePerHour": 20,
            "floor": 3,
            "location": {"coordinates": [31.2401, 30.0500]},
            "ammenities": ["wifi"],
        }),
        json!({
            "name": "Workshop Hall",
            "title": "Open space for workshops and trainings",
            "area": 140,
            "maxSize": 40,
            "pricePerHour": 150,
            "floor": 1,
            "location": {"coordinates": [31.2290, 30.0410]},
            "ammenities": ["projector", "sound system", "wifi", "kitchen"],
        }),
    ]
}

fn demo_users() -> Vec<Value> {
    vec![
        json!({
            "name": "Admin",
            "email": "admin@booking.local",
            "role": "admin",
            "password": "admin-pass-1234",
            "passwordConfirm": "admin-pass-1234",
        }),
        json!({
            "name": "Demo User",
            "email": "user@booking.local",
            "password": "user-pass-1234",
            "passwordConfirm": "user-pass-1234",
        }),
    ]
}

/// Insert the demo rooms and users unless they are already present.
pub async fn load_seed_data<S: DocumentStore + ?Sized>(store: &S) -> Result<()> {
    let mut inserted = 0;

    for mut room in demo_rooms() {
        room["availability"] = office_hours();
        if seed_document::<Room, S>(store, room, "name").await? {
            inserted += 1;
        }
    }

    for user in demo_users() {
        if seed_document::<User, S>(store, user, "email").await? {
            inserted += 1;
        }
    }

    log::info!("Seed data loaded: {inserted} new documents");
    Ok(())
}

/// Store one document unless another already has the same `key` value.
async fn seed_document<R, S>(store: &S, body: Value, key: &str) -> Result<bool>
where
    R: Resource,
    S: DocumentStore + ?Sized,
{
    let Value::Object(body) = body else {
        anyhow::bail!("Seed {} must be a JSON object", R::SINGULAR);
    };
    let document: Document = prepare_write::<R>(body, WriteMode::Create).map_err(|errors| {
        anyhow::anyhow!("Invalid seed {}: {}", R::SINGULAR, errors.messages().join(". "))
    })?;
    let value = document
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .with_context(|| format!("Seed {} has no `{key}`", R::SINGULAR))?;

    if store
        .find_one(R::COLLECTION, FilterQuery::equals(key, value.as_str()))
        .await?
        .is_some()
    {
        log::debug!("Seed {} `{value}` already present", R::SINGULAR);
        return Ok(false);
    }
    store.insert(R::COLLECTION, document).await?;

    Ok(true)
}
