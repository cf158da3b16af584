use crate::{
    auth::{hash_password, session, verify_password, AuthResponse, CurrentUser, LoginRequest},
    error::AppError,
    models::{
        user::{avatar_content_type, is_allowed_avatar_filename},
        SignupInput, UpdateUserInput, User,
    },
};
use actix_multipart::Multipart;
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use futures::TryStreamExt;
use sqlx::PgPool;
use validator::Validate;

const USER_COLUMNS: &str = "id, name, email, password_hash, created_at, updated_at";

/// Uploads above this size are rejected outright.
const MAX_AVATAR_BYTES: usize = 1_000_000;

/// Sign up a new user
///
/// Creates the account, records a first session token and returns both.
#[post("/users")]
pub async fn signup(
    pool: web::Data<PgPool>,
    signup_data: web::Json<SignupInput>,
) -> Result<impl Responder, AppError> {
    // Validate input
    signup_data.validate()?;

    // Check if email already exists
    let existing_user: Option<(i32,)> =
        sqlx::query_as("SELECT id FROM users WHERE email = $1")
            .bind(&signup_data.email)
            .fetch_optional(&**pool)
            .await?;

    if existing_user.is_some() {
        return Err(AppError::BadRequest("Email already registered".into()));
    }

    // Hash password
    let password_hash = hash_password(&signup_data.password)?;

    // Insert new user
    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3) RETURNING {}",
        USER_COLUMNS
    ))
    .bind(&signup_data.name)
    .bind(&signup_data.email)
    .bind(&password_hash)
    .fetch_one(&**pool)
    .await
    // The SELECT above races with concurrent signups; the unique index
    // has the final word.
    .map_err(map_unique_email_violation)?;

    // Record the first session token
    let token = session::issue_token(&pool, user.id).await?;

    Ok(HttpResponse::Created().json(AuthResponse { user, token }))
}

/// Login
///
/// Verifies credentials and appends a fresh token to the user's token list.
/// Any failure (unknown email or wrong password) yields the same 400.
#[post("/users/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    // Validate input
    login_data.validate()?;

    // Get user from database
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE email = $1",
        USER_COLUMNS
    ))
    .bind(&login_data.email)
    .fetch_optional(&**pool)
    .await?;

    // Do not reveal whether the email exists or the password was wrong.
    let user = match user {
        Some(user) => {
            if verify_password(&login_data.password, &user.password_hash)? {
                user
            } else {
                return Err(AppError::BadRequest("Unable to login".into()));
            }
        }
        None => return Err(AppError::BadRequest("Unable to login".into())),
    };

    let token = session::issue_token(&pool, user.id).await?;

    Ok(HttpResponse::Ok().json(AuthResponse { user, token }))
}

/// Logout the current session
///
/// Removes exactly the token that authenticated this request; other
/// sessions stay valid.
#[post("/users/logout")]
pub async fn logout(
    pool: web::Data<PgPool>,
    current: CurrentUser,
) -> Result<impl Responder, AppError> {
    session::revoke_token(&pool, current.user.id, &current.token).await?;

    Ok(HttpResponse::Ok().finish())
}

/// Logout everywhere
///
/// Clears the user's entire token list.
#[post("/users/logoutAll")]
pub async fn logout_all(
    pool: web::Data<PgPool>,
    current: CurrentUser,
) -> Result<impl Responder, AppError> {
    session::revoke_all(&pool, current.user.id).await?;

    Ok(HttpResponse::Ok().finish())
}

/// Read the authenticated user's profile
#[get("/users/me")]
pub async fn profile(current: CurrentUser) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(current.user))
}

/// Update the authenticated user's profile
///
/// Accepts name, email and password; anything else in the body fails
/// deserialization and is rejected with 400 before this handler runs.
#[patch("/users/me")]
pub async fn update_profile(
    pool: web::Data<PgPool>,
    current: CurrentUser,
    update_data: web::Json<UpdateUserInput>,
) -> Result<impl Responder, AppError> {
    update_data.validate()?;

    let update = update_data.into_inner();
    let mut user = current.user;

    if update.is_empty() {
        return Ok(HttpResponse::Ok().json(user));
    }

    if let Some(name) = update.name {
        user.name = name;
    }
    if let Some(email) = update.email {
        user.email = email;
    }
    if let Some(password) = update.password {
        user.password_hash = hash_password(&password)?;
    }

    let user = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET name = $1, email = $2, password_hash = $3, updated_at = now()
         WHERE id = $4 RETURNING {}",
        USER_COLUMNS
    ))
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.id)
    .fetch_one(&**pool)
    .await
    .map_err(map_unique_email_violation)?;

    Ok(HttpResponse::Ok().json(user))
}

/// Delete the authenticated user's account
///
/// Sessions and tasks go with it (FK cascade). Returns the deleted profile.
#[delete("/users/me")]
pub async fn delete_profile(
    pool: web::Data<PgPool>,
    current: CurrentUser,
) -> Result<impl Responder, AppError> {
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(current.user.id)
        .execute(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(current.user))
}

/// Upload an avatar
///
/// Expects a multipart field named `avatar`. The file is buffered in
/// memory, capped at 1 MB, and only jpg/jpeg/png filenames are accepted.
#[post("/users/me/avatar")]
pub async fn upload_avatar(
    pool: web::Data<PgPool>,
    current: CurrentUser,
    mut payload: Multipart,
) -> Result<impl Responder, AppError> {
    let mut upload: Option<(Vec<u8>, &'static str)> = None;

    while let Some(mut field) = payload.try_next().await? {
        if field.name() != "avatar" {
            // Drain unrelated fields so the stream can make progress.
            while field.try_next().await?.is_some() {}
            continue;
        }

        let filename = field
            .content_disposition()
            .get_filename()
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("Please upload an image".into()))?;

        if !is_allowed_avatar_filename(&filename) {
            return Err(AppError::BadRequest(
                "Please upload an image (jpg, jpeg or png)".into(),
            ));
        }
        let mime = avatar_content_type(&filename)
            .ok_or_else(|| AppError::BadRequest("Please upload an image".into()))?;

        let mut buffer = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            if buffer.len() + chunk.len() > MAX_AVATAR_BYTES {
                return Err(AppError::BadRequest(
                    "Image must be smaller than 1MB".into(),
                ));
            }
            buffer.extend_from_slice(&chunk);
        }

        if buffer.is_empty() {
            return Err(AppError::BadRequest("Please upload an image".into()));
        }

        upload = Some((buffer, mime));
    }

    let (buffer, mime) =
        upload.ok_or_else(|| AppError::BadRequest("Please upload an image".into()))?;

    sqlx::query("UPDATE users SET avatar = $1, avatar_mime = $2, updated_at = now() WHERE id = $3")
        .bind(&buffer)
        .bind(mime)
        .bind(current.user.id)
        .execute(&**pool)
        .await?;

    Ok(HttpResponse::Ok().finish())
}

/// Delete the stored avatar
#[delete("/users/me/avatar")]
pub async fn delete_avatar(
    pool: web::Data<PgPool>,
    current: CurrentUser,
) -> Result<impl Responder, AppError> {
    sqlx::query(
        "UPDATE users SET avatar = NULL, avatar_mime = NULL, updated_at = now() WHERE id = $1",
    )
    .bind(current.user.id)
    .execute(&**pool)
    .await?;

    Ok(HttpResponse::Ok().finish())
}

/// Serve a user's avatar
///
/// Publicly readable: avatars are referenced by user id, e.g. from profile
/// pages. 404 when the user does not exist or has no avatar.
#[get("/users/{id}/avatar")]
pub async fn get_avatar(
    pool: web::Data<PgPool>,
    user_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let row = sqlx::query_as::<_, (Option<Vec<u8>>, Option<String>)>(
        "SELECT avatar, avatar_mime FROM users WHERE id = $1",
    )
    .bind(user_id.into_inner())
    .fetch_optional(&**pool)
    .await?;

    match row {
        Some((Some(avatar), mime)) => Ok(HttpResponse::Ok()
            .content_type(mime.unwrap_or_else(|| "application/octet-stream".to_string()))
            .body(avatar)),
        _ => Err(AppError::NotFound("Avatar not found".into())),
    }
}

fn map_unique_email_violation(error: sqlx::Error) -> AppError {
    match &error {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::BadRequest("Email already in use".into())
        }
        _ => error.into(),
    }
}
