//! Shared helpers for the integration tests: database setup, an app
//! factory matching the production wiring, and request fixtures.

use actix_cors::Cors;
use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::middleware::Logger;
use actix_web::{test, web, App, Error};
use dotenv::dotenv;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

/// A 1x1 PNG, enough to exercise the upload pipeline.
#[allow(dead_code)]
pub const PIXEL_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x62, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// Connects to the test database and ensures the schema is in place.
///
/// Tests run concurrently, so no global table wipes happen here; every
/// test works with its own unique emails and cleans up after itself.
pub async fn setup_pool() -> PgPool {
    dotenv().ok();
    if std::env::var("JWT_SECRET").is_err() {
        std::env::set_var("JWT_SECRET", "integration-test-secret");
    }

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
    let pool = taskhub::db::connect_pool(&database_url)
        .await
        .expect("Failed to connect to test DB");

    taskhub::db::migrate(&pool)
        .await
        .expect("Failed to run migrations on test DB");

    pool
}

/// Builds the app exactly as `main.rs` does.
pub async fn init_app(
    pool: &PgPool,
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = Error> {
    test::init_service(
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .wrap(taskhub::auth::AuthMiddleware)
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .configure(taskhub::routes::config),
    )
    .await
}

/// An email that cannot collide with other concurrently running tests.
pub fn unique_email(prefix: &str) -> String {
    format!("{}-{}@example.com", prefix, Uuid::new_v4())
}

// Helper struct to hold auth details
pub struct TestUser {
    pub id: i32,
    pub token: String,
    pub email: String,
}

/// Signs up a user through the API and returns its id and first token.
pub async fn signup_user(
    app: &impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = Error>,
    name: &str,
    email: &str,
    password: &str,
) -> TestUser {
    let req = test::TestRequest::post()
        .uri("/users")
        .set_json(json!({
            "name": name,
            "email": email,
            "password": password
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body_bytes = test::read_body(resp).await;
    assert_eq!(
        status,
        actix_web::http::StatusCode::CREATED,
        "Fixture signup failed. Body: {:?}",
        String::from_utf8_lossy(&body_bytes)
    );

    let body: serde_json::Value =
        serde_json::from_slice(&body_bytes).expect("Failed to parse signup response");

    TestUser {
        id: body["user"]["id"].as_i64().expect("user id in signup response") as i32,
        token: body["token"].as_str().expect("token in signup response").to_string(),
        email: email.to_string(),
    }
}

/// Creates a task through the API and returns its id.
pub async fn create_task(
    app: &impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = Error>,
    token: &str,
    description: &str,
    completed: bool,
) -> Uuid {
    let req = test::TestRequest::post()
        .uri("/tasks")
        .append_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({
            "description": description,
            "completed": completed
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body_bytes = test::read_body(resp).await;
    assert_eq!(
        status,
        actix_web::http::StatusCode::CREATED,
        "Fixture task creation failed. Body: {:?}",
        String::from_utf8_lossy(&body_bytes)
    );

    let body: serde_json::Value =
        serde_json::from_slice(&body_bytes).expect("Failed to parse task response");
    body["id"]
        .as_str()
        .and_then(|id| Uuid::parse_str(id).ok())
        .expect("task id in creation response")
}

/// Removes a user (sessions and tasks cascade with it).
pub async fn cleanup_user(pool: &PgPool, email: &str) {
    let _ = sqlx::query("DELETE FROM users WHERE email = $1")
        .bind(email)
        .execute(pool)
        .await;
}

/// Builds a multipart/form-data body holding a single file field.
/// Returns the Content-Type header value and the raw body.
#[allow(dead_code)]
pub fn multipart_body(
    field: &str,
    filename: &str,
    content_type: &str,
    data: &[u8],
) -> (String, Vec<u8>) {
    let boundary = "----taskhub-test-boundary-7MA4YWxkTrZu0gW";

    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    (
        format!("multipart/form-data; boundary={}", boundary),
        body,
    )
}
