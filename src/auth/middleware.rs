use std::rc::Rc;

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::Method,
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use lazy_static::lazy_static;
use sqlx::PgPool;

use crate::auth::extractors::CurrentUser;
use crate::auth::session;
use crate::error::AppError;

lazy_static! {
    // GET /users/{id}/avatar is the one publicly readable user resource.
    static ref PUBLIC_AVATAR_REGEX: regex::Regex =
        regex::Regex::new(r"^/users/[^/]+/avatar$").unwrap();
}

/// Application-wide bearer authentication.
///
/// Requests to public endpoints (signup, login, health, avatar reads) pass
/// through untouched. Every other request must carry an
/// `Authorization: Bearer` token that resolves against the sessions table;
/// the resolved user and the presented token are stored in request
/// extensions for [`CurrentUser`] to pick up.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    // The session lookup is async, so the inner service is called after an
    // await point and must be shareable with the boxed future.
    service: Rc<S>,
}

fn is_public(method: &Method, path: &str) -> bool {
    if *method == Method::GET {
        path == "/health" || PUBLIC_AVATAR_REGEX.is_match(path)
    } else if *method == Method::POST {
        path == "/users" || path == "/users/login"
    } else {
        false
    }
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if is_public(req.method(), req.path()) {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        let service = Rc::clone(&self.service);
        Box::pin(async move {
            let token = req
                .headers()
                .get("Authorization")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(str::to_string);

            let token = match token {
                Some(token) => token,
                None => {
                    return Err(AppError::Unauthorized("Please authenticate.".into()).into());
                }
            };

            let pool = req
                .app_data::<web::Data<PgPool>>()
                .cloned()
                .ok_or_else(|| {
                    AppError::InternalServerError("Database pool not configured".into())
                })?;

            let user = session::authenticate(&pool, &token).await?;
            req.extensions_mut().insert(CurrentUser { user, token });

            service.call(req).await
        })
    }
}
