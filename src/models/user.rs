use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

lazy_static! {
    // Filenames accepted for avatar uploads.
    static ref AVATAR_FILENAME_REGEX: regex::Regex =
        regex::Regex::new(r"(?i)\.(jpg|jpeg|png)$").unwrap();
}

/// A user row as stored in the database.
///
/// The password hash never leaves the server: it is skipped during
/// serialization. The avatar bytes live in separate columns and are only
/// fetched by the avatar endpoints, so profile responses stay small.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for `POST /users` (signup).
#[derive(Debug, Deserialize, Validate)]
pub struct SignupInput {
    /// Display name, required and non-empty.
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Must be a valid email address; uniqueness is enforced by the database.
    #[validate(email)]
    pub email: String,
    /// At least 7 characters and must not contain the word "password".
    #[validate(length(min = 7, max = 100), custom = "validate_password_content")]
    pub password: String,
}

/// Payload for `PATCH /users/me`.
///
/// `deny_unknown_fields` is the update whitelist: a body containing any
/// other key fails deserialization and the request is rejected with 400.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserInput {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 7, max = 100), custom = "validate_password_content")]
    pub password: Option<String>,
}

impl UpdateUserInput {
    /// True when the body carried no updatable field at all.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.password.is_none()
    }
}

fn validate_password_content(password: &str) -> Result<(), ValidationError> {
    if password.to_lowercase().contains("password") {
        return Err(ValidationError::new("password_contains_password"));
    }
    Ok(())
}

/// Returns true when `filename` has an accepted avatar extension.
pub fn is_allowed_avatar_filename(filename: &str) -> bool {
    AVATAR_FILENAME_REGEX.is_match(filename)
}

/// Maps an accepted avatar filename to the content type stored with the bytes.
pub fn avatar_content_type(filename: &str) -> Option<&'static str> {
    let lower = filename.to_lowercase();
    if lower.ends_with(".png") {
        Some("image/png")
    } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        Some("image/jpeg")
    } else {
        None
    }
}
