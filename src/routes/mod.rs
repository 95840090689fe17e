// teamspace-service/src/routes/mod.rs
use actix_web::{get, web, HttpRequest, HttpResponse};

use crate::models::{ServiceError, User};
use crate::services::identity_service;
use crate::state::AppState;
use crate::utils::get_identity_from_request;

pub mod admin_routes;
pub mod auth_routes;
pub mod file_routes;
pub mod team_routes;
pub mod user_routes;

// Resolve the caller's identity to their user record
pub(crate) fn current_user(state: &AppState, req: &HttpRequest) -> Result<User, ServiceError> {
    let identity = get_identity_from_request(req);
    identity_service::require_authenticated_user(&state.db, identity.as_ref())
}

#[get("/")]
async fn index() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "service": "teamspace-service",
        "status": "ok"
    }))
}

// Register every route group on an app or test service
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index);
    auth_routes::init_routes(cfg);
    user_routes::init_routes(cfg);
    team_routes::init_routes(cfg);
    file_routes::init_routes(cfg);
    admin_routes::init_routes(cfg);
}
