use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::error::AppError;
use crate::models::User;

/// Extracts the authenticated user and the bearer token that authenticated
/// this request from request extensions.
///
/// This extractor is intended to be used on routes protected by
/// `AuthMiddleware`, which resolves the token against the sessions table
/// and inserts a `CurrentUser` into request extensions. Carrying the token
/// lets logout revoke exactly the session that made the request.
///
/// If no `CurrentUser` is found in the extensions (e.g. the middleware did
/// not run), the extractor responds with 401.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

impl FromRequest for CurrentUser {
    type Error = ActixError; // AppError will be converted into ActixError via ResponseError
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<CurrentUser>().cloned() {
            Some(current) => ready(Ok(current)),
            None => {
                // Only reachable when a protected route is registered
                // outside AuthMiddleware; 401 is the safe answer.
                let err = AppError::Unauthorized("Please authenticate.".to_string());
                ready(Err(err.into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::dev::Payload;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use chrono::Utc;

    fn sample_user() -> User {
        User {
            id: 123,
            name: "Ivan".to_string(),
            email: "ivan@example.com".to_string(),
            password_hash: "$2b$12$hash".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[actix_rt::test]
    async fn test_current_user_extractor_success() {
        let req = test::TestRequest::default().to_http_request();
        req.extensions_mut().insert(CurrentUser {
            user: sample_user(),
            token: "token-abc".to_string(),
        });

        let mut payload = Payload::None;
        let extracted = CurrentUser::from_request(&req, &mut payload).await;
        assert!(extracted.is_ok());

        let current = extracted.unwrap();
        assert_eq!(current.user.id, 123);
        assert_eq!(current.token, "token-abc");
    }

    #[actix_rt::test]
    async fn test_current_user_extractor_failure() {
        let req = test::TestRequest::default().to_http_request();
        // Nothing inserted into extensions

        let mut payload = Payload::None;
        let extracted = CurrentUser::from_request(&req, &mut payload).await;
        assert!(extracted.is_err());

        let err = extracted.unwrap_err();
        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
