// teamspace-service/src/models/mod.rs
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub mod admin;
pub use admin::*;

pub mod file;
pub use file::*;

pub mod team;
pub use team::*;

pub mod user;
pub use user::*;

// Query string shared by the search endpoints
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SearchQuery {
    pub query: String,
    pub limit: Option<usize>,
}

// Every failure the core can raise. Variants map one-to-one onto HTTP statuses.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum ServiceError {
    #[display(fmt = "Not authenticated")]
    Unauthenticated,
    #[display(fmt = "Not authorized: {}", _0)]
    NotAuthorized(String),
    #[display(fmt = "Not found: {}", _0)]
    NotFound(String),
    #[display(fmt = "Already exists: {}", _0)]
    AlreadyExists(String),
    #[display(
        fmt = "Team {} storage limit exceeded: {} bytes used + {} requested > {} allowed",
        team_id,
        used,
        requested,
        limit
    )]
    QuotaExceeded {
        team_id: String,
        used: u64,
        requested: u64,
        limit: u64,
    },
    #[display(fmt = "Invariant violation: {}", _0)]
    InvariantViolation(String),
    #[display(fmt = "File type not allowed for this team: {}", _0)]
    UnsupportedFileType(String),
    #[display(fmt = "Bad request: {}", _0)]
    BadRequest(String),
    #[display(fmt = "Storage error: {}", _0)]
    Storage(String),
}

impl ServiceError {
    // Stable machine-readable code surfaced alongside the message
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Unauthenticated => "unauthenticated",
            ServiceError::NotAuthorized(_) => "not_authorized",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::AlreadyExists(_) => "already_exists",
            ServiceError::QuotaExceeded { .. } => "quota_exceeded",
            ServiceError::InvariantViolation(_) => "invariant_violation",
            ServiceError::UnsupportedFileType(_) => "unsupported_file_type",
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::Storage(_) => "storage_error",
        }
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, ServiceError::Storage(_))
    }
}

impl std::error::Error for ServiceError {}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ServiceError::NotAuthorized(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::AlreadyExists(_) => StatusCode::CONFLICT,
            ServiceError::QuotaExceeded { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ServiceError::InvariantViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::UnsupportedFileType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }))
    }
}
