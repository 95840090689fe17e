// teamspace-service/src/utils/mod.rs
use actix_web::{HttpMessage, HttpRequest};
use lazy_static::lazy_static;
use log::warn;
use regex::Regex;
use std::time::Duration;

use crate::models::{Claims, ServiceError};

pub mod team_lock;

pub use auth_middleware::Auth;
pub use team_lock::TeamLockRegistry;

lazy_static! {
    static ref EMAIL_PATTERN: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

// Bearer token handling for identities issued by the external provider
pub mod jwt {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    // Validate and decode a JWT token
    pub fn decode_token(token: &str, secret: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| ServiceError::Unauthenticated)
    }

    // Extract JWT from Authorization header
    pub fn extract_token_from_header(auth_header: &str) -> Result<String, ServiceError> {
        match auth_header.strip_prefix("Bearer ") {
            Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            _ => Err(ServiceError::Unauthenticated),
        }
    }
}

// Middleware decoding the caller's identity into request extensions.
// Requests without a valid token pass through anonymously; handlers reject
// them through `require_authenticated_user`.
pub mod auth_middleware {
    use super::*;
    use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
    use actix_web::http::header;
    use actix_web::Error;
    use futures::future::{ok, LocalBoxFuture, Ready};
    use log::debug;
    use std::sync::Arc;

    pub struct Auth {
        secret: Arc<String>,
    }

    impl Auth {
        pub fn new(secret: impl Into<String>) -> Self {
            Self {
                secret: Arc::new(secret.into()),
            }
        }
    }

    impl<S, B> Transform<S, ServiceRequest> for Auth
    where
        S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
        S::Future: 'static,
        B: 'static,
    {
        type Response = ServiceResponse<B>;
        type Error = Error;
        type Transform = AuthenticationMiddleware<S>;
        type InitError = ();
        type Future = Ready<Result<Self::Transform, Self::InitError>>;

        fn new_transform(&self, service: S) -> Self::Future {
            ok(AuthenticationMiddleware {
                service,
                secret: self.secret.clone(),
            })
        }
    }

    pub struct AuthenticationMiddleware<S> {
        service: S,
        secret: Arc<String>,
    }

    impl<S, B> Service<ServiceRequest> for AuthenticationMiddleware<S>
    where
        S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
        S::Future: 'static,
        B: 'static,
    {
        type Response = ServiceResponse<B>;
        type Error = Error;
        type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

        forward_ready!(service);

        fn call(&self, req: ServiceRequest) -> Self::Future {
            let claims = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| jwt::extract_token_from_header(value).ok())
                .and_then(|token| match jwt::decode_token(&token, &self.secret) {
                    Ok(claims) => Some(claims),
                    Err(_) => {
                        debug!("Rejected bearer token on {}", req.path());
                        None
                    }
                });

            if let Some(claims) = claims {
                req.extensions_mut().insert(claims);
            }

            Box::pin(self.service.call(req))
        }
    }
}

// Identity attached by the `Auth` middleware, if any
pub fn get_identity_from_request(req: &HttpRequest) -> Option<Claims> {
    req.extensions().get::<Claims>().cloned()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email.trim())
}

// Case-insensitive prefix match used by every search query
pub fn matches_prefix(value: &str, query: &str) -> bool {
    value.to_lowercase().starts_with(&query.trim().to_lowercase())
}

pub fn clamp_limit(limit: Option<usize>, default: usize, max: usize) -> usize {
    limit.unwrap_or(default).clamp(1, max)
}

// Retry an idempotent read on storage failures with doubling backoff
pub async fn retry_read<T, F>(attempts: u32, mut read: F) -> Result<T, ServiceError>
where
    F: FnMut() -> Result<T, ServiceError>,
{
    let mut delay = Duration::from_millis(50);
    let mut attempt = 1;
    loop {
        match read() {
            Err(err) if err.is_storage() && attempt < attempts => {
                warn!("⚠️ Read attempt {} failed ({}), retrying in {:?}", attempt, err, delay);
                actix_web::rt::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            result => return result,
        }
    }
}
