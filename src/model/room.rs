use serde_json::{json, Value};

use crate::model::{
    is_clock_time, Collection, Document, Resource, ValidationErrors, Validator, WriteMode,
};

pub const WEEKDAYS: [&str; 7] = [
    "sunday",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
];

pub struct Room;

impl Resource for Room {
    const COLLECTION: Collection = Collection::Rooms;
    const SINGULAR: &'static str = "room";
    const PLURAL: &'static str = "rooms";
    const POPULATION: Option<&'static [&'static str]> = Some(&["reviews", "reviews.user"]);
    const FIELDS: &'static [&'static str] = &[
        "name",
        "area",
        "maxSize",
        "pricePerHour",
        "floor",
        "title",
        "description",
        "image",
        "rating",
        "ratingsQuantity",
        "location",
        "ammenities",
        "availability",
    ];

    fn prepare(document: &mut Document, mode: WriteMode) {
        if let Some(name) = document.get("name").and_then(Value::as_str) {
            let slug = slugify(name);
            document.insert("slug".to_string(), Value::String(slug));
        }

        if let Some(Value::Object(location)) = document.get_mut("location") {
            location
                .entry("type")
                .or_insert_with(|| Value::String("Point".to_string()));
        }

        if let Some(Value::Object(availability)) = document.get_mut("availability") {
            for day in availability.values_mut() {
                if let Value::Object(slot) = day {
                    slot.entry("on").or_insert(Value::Bool(false));
                }
            }
        }

        if mode == WriteMode::Create {
            document.entry("rating").or_insert(json!(5));
            document.entry("ratingsQuantity").or_insert(json!(0));
        }
    }

    fn validate(document: &Document, mode: WriteMode) -> Result<(), ValidationErrors> {
        let mut validator = Validator::new(document, mode)
            .required("name", "A room must have a name")
            .required("area", "A room must have an area")
            .required("maxSize", "A room must have maximum number of people")
            .required("pricePerHour", "A room must have price per hour")
            .required("location.coordinates", "A room location must have coordinates")
            .number("area")
            .number("maxSize")
            .number("pricePerHour")
            .number("floor")
            .check(
                "location.type",
                "Room location type must be Point",
                |value| value == "Point",
            );

        for day in WEEKDAYS {
            let upper = day.to_uppercase();
            for bound in ["from", "to"] {
                let path = format!("availability.{day}.{bound}");
                validator = validator
                    .required(
                        &path,
                        &format!("Availability on {upper} {bound} time is required"),
                    )
                    .check(
                        &path,
                        &format!(
                            "Time availability {bound} on {upper} is invalid must be of format HH:mm as following 09:00"
                        ),
                        is_clock_time,
                    );
            }
        }

        validator.finish()
    }
}

/// Lower-case, hyphen-separated form of a room name used for slug lookups.
pub fn slugify(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::prepare_write;

    fn room_body(name: &str) -> Document {
        let availability: serde_json::Map<String, Value> = WEEKDAYS
            .iter()
            .map(|day| (day.to_string(), json!({"from": "09:00", "to": "17:00"})))
            .collect();

        json!({
            "name": name,
            "area": 40,
            "maxSize": 8,
            "pricePerHour": 75,
            "location": {"coordinates": [31.2, 30.0]},
            "availability": availability,
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("The Blue  Room!"), "the-blue-room");
        assert_eq!(slugify("Studio 4"), "studio-4");
    }

    #[test]
    fn test_create_applies_defaults_and_slug() {
        let room = prepare_write::<Room>(room_body("Sunny Loft"), WriteMode::Create).unwrap();

        assert_eq!(room["slug"], "sunny-loft");
        assert_eq!(room["rating"], 5);
        assert_eq!(room["ratingsQuantity"], 0);
        assert_eq!(room["location"]["type"], "Point");
        assert_eq!(room["availability"]["monday"]["on"], false);
    }

    #[test]
    fn test_create_rejects_missing_fields_and_bad_times() {
        let mut body = room_body("Sunny Loft");
        body.remove("area");
        body["availability"]["friday"]["to"] = json!("5pm");

        let errors = prepare_write::<Room>(body, WriteMode::Create).unwrap_err();
        assert!(errors
            .messages()
            .contains(&"A room must have an area".to_string()));
        assert!(errors.messages().iter().any(|m| m.contains("FRIDAY")));
    }

    #[test]
    fn test_update_only_validates_touched_fields() {
        let body = json!({"pricePerHour": 90}).as_object().cloned().unwrap();
        let update = prepare_write::<Room>(body, WriteMode::Update).unwrap();
        assert_eq!(update["pricePerHour"], 90);
        assert!(!update.contains_key("rating"));
    }

    #[test]
    fn test_unknown_fields_are_dropped() {
        let mut body = room_body("Sunny Loft");
        body.insert("owner".to_string(), json!("me"));
        body.insert("_id".to_string(), json!("forged"));

        let room = prepare_write::<Room>(body, WriteMode::Create).unwrap();
        assert!(!room.contains_key("owner"));
        assert!(!room.contains_key("_id"));
    }
}
