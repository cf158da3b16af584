pub mod extractors;
pub mod middleware;
pub mod password;
pub mod session;
pub mod token;

use serde::{Deserialize, Serialize};
use validator::Validate;

// Re-export necessary items
pub use extractors::CurrentUser;
pub use middleware::AuthMiddleware;
pub use password::{hash_password, verify_password};
pub use token::{generate_token, verify_token, Claims};

use crate::models::User;

/// Represents the payload for a user login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// User's email address.
    /// Must be a valid email format.
    #[validate(email)]
    pub email: String,
    /// User's password.
    #[validate(length(min = 1))]
    pub password: String,
}

/// Response structure after successful signup or login.
///
/// Mirrors the persisted state: the token is the one just appended to the
/// user's token list.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// The authenticated user's profile (secrets are skipped during
    /// serialization).
    pub user: User,
    /// The newly issued session token.
    pub token: String,
}
