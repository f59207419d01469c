use serde_json::Value;

use crate::model::{Collection, Document, Resource, ValidationErrors, Validator, WriteMode};

pub const ROLES: [&str; 2] = ["user", "admin"];
const MIN_PASSWORD_LENGTH: usize = 8;
const PASSWORD_HASH_COST: u32 = 12;

pub struct User;

impl Resource for User {
    const COLLECTION: Collection = Collection::Users;
    const SINGULAR: &'static str = "user";
    const PLURAL: &'static str = "users";
    const POPULATION: Option<&'static [&'static str]> =
        Some(&["bookings", "bookings.room", "reviews", "reviews.room"]);
    const FIELDS: &'static [&'static str] =
        &["name", "email", "role", "image", "password", "passwordConfirm"];

    fn prepare(document: &mut Document, mode: WriteMode) {
        if let Some(Value::String(email)) = document.get_mut("email") {
            *email = email.to_lowercase();
        }
        if mode == WriteMode::Create {
            document
                .entry("role")
                .or_insert_with(|| Value::String(ROLES[0].to_string()));
        }
    }

    fn validate(document: &Document, mode: WriteMode) -> Result<(), ValidationErrors> {
        let password = document.get("password").and_then(Value::as_str);

        let mut validator = Validator::new(document, mode)
            .required("name", "A user must have a name")
            .required("email", "A user must have an email address")
            .check("email", "Please enter a valid email address", is_email)
            .one_of("role", &ROLES)
            .required("password", "A user must have a password")
            .check(
                "password",
                "Password length should be a minimum of 8 characters",
                |value| value.as_str().map_or(false, |p| p.chars().count() >= MIN_PASSWORD_LENGTH),
            );

        if mode == WriteMode::Create || password.is_some() {
            validator = validator
                .required("passwordConfirm", "Please confirm the password")
                .check("passwordConfirm", "Passwords are not the same", |value| {
                    value.as_str() == password
                });
        }

        validator.finish()
    }

    fn before_save(document: &mut Document) -> Result<(), ValidationErrors> {
        document.remove("passwordConfirm");
        if let Some(Value::String(password)) = document.get_mut("password") {
            *password = bcrypt::hash(password.as_str(), PASSWORD_HASH_COST).map_err(|error| {
                log::error!("Password hashing failed: {error}");
                ValidationErrors(vec!["Password could not be stored".to_string()])
            })?;
        }
        Ok(())
    }
}

fn is_email(value: &Value) -> bool {
    let Some(email) = value.as_str() else {
        return false;
    };
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.split('.').count() >= 2
                && domain.split('.').all(|part| !part.is_empty())
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
