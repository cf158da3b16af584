//! Server-side session tracking.
//!
//! Every issued bearer token is recorded in the `sessions` table, one row
//! per token, so that logout can revoke tokens individually or all at once.
//! A request authenticates only when its token both verifies
//! cryptographically and is still present in the owner's token list.

use crate::auth::token::{generate_token, verify_token};
use crate::error::AppError;
use crate::models::User;
use sqlx::PgPool;

/// Issues a fresh token for `user_id` and appends it to the user's token list.
pub async fn issue_token(pool: &PgPool, user_id: i32) -> Result<String, AppError> {
    let token = generate_token(user_id)?;

    sqlx::query("INSERT INTO sessions (user_id, token) VALUES ($1, $2)")
        .bind(user_id)
        .bind(&token)
        .execute(pool)
        .await?;

    Ok(token)
}

/// Resolves a presented bearer token to its user.
///
/// The JWT must verify (signature and expiry), and the exact token string
/// must still exist in the sessions table for the claimed user. A token
/// that was logged out therefore fails with 401 even though its signature
/// remains valid until expiry.
pub async fn authenticate(pool: &PgPool, token: &str) -> Result<User, AppError> {
    let claims = verify_token(token)?;

    sqlx::query_as::<_, User>(
        "SELECT u.id, u.name, u.email, u.password_hash, u.created_at, u.updated_at
         FROM users u
         JOIN sessions s ON s.user_id = u.id
         WHERE u.id = $1 AND s.token = $2",
    )
    .bind(claims.sub)
    .bind(token)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::Unauthorized("Please authenticate.".into()))
}

/// Removes a single token from the user's token list (logout).
pub async fn revoke_token(pool: &PgPool, user_id: i32, token: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND token = $2")
        .bind(user_id)
        .bind(token)
        .execute(pool)
        .await?;

    Ok(())
}

/// Clears the user's entire token list (logout everywhere).
pub async fn revoke_all(pool: &PgPool, user_id: i32) -> Result<(), AppError> {
    sqlx::query("DELETE FROM sessions WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}
