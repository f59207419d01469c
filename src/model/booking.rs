use chrono::NaiveDate;
use serde_json::Value;

use crate::model::{is_clock_time, Collection, Document, Resource, ValidationErrors, Validator, WriteMode};

pub struct Booking;

impl Resource for Booking {
    const COLLECTION: Collection = Collection::Bookings;
    const SINGULAR: &'static str = "booking";
    const PLURAL: &'static str = "bookings";
    const POPULATION: Option<&'static [&'static str]> = Some(&["room", "room.reviews", "user"]);
    const FIELDS: &'static [&'static str] =
        &["room", "user", "day", "from", "to", "pricePerHour", "isReviewed"];
    const TIMESTAMPS: bool = true;

    fn prepare(document: &mut Document, mode: WriteMode) {
        if let Some(Value::String(day)) = document.get_mut("day") {
            if let Some(date) = parse_day(day) {
                *day = date.format("%Y-%m-%d").to_string();
            }
        }
        if mode == WriteMode::Create {
            document.entry("isReviewed").or_insert(Value::Bool(false));
        }
    }

    fn validate(document: &Document, mode: WriteMode) -> Result<(), ValidationErrors> {
        Validator::new(document, mode)
            .required("room", "A booking must have a room")
            .required("user", "A booking must have a user")
            .required("day", "A booking must be on a specific day")
            .check("day", "Booking day must be a date as following 2022-01-20", |value| {
                value.as_str().and_then(parse_day).is_some()
            })
            .required("from", "A booking must have starting time")
            .check(
                "from",
                "Starting time is invalid must be of format HH:mm as following 09:00",
                is_clock_time,
            )
            .required("to", "A booking must have ending time")
            .check(
                "to",
                "Ending time is invalid must be of format HH:mm as following 09:00",
                is_clock_time,
            )
            .required("pricePerHour", "A booking must have a price per hour for the room")
            .number("pricePerHour")
            .finish()
    }
}

/// Start of the booked day; accepts `2022-01-20` or a full RFC 3339 timestamp.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        chrono::DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|timestamp| timestamp.date_naive())
    })
}
