// teamspace-service/src/routes/auth_routes.rs
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use log::{error, info};

use crate::models::{ProfileFields, ServiceError};
use crate::routes::current_user;
use crate::services::{identity_service, user_service};
use crate::state::AppState;
use crate::utils::{get_identity_from_request, retry_read};

// Create or refresh the caller's user record from their token claims
#[post("/auth/sync")]
async fn sync_user(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ServiceError> {
    let claims = get_identity_from_request(&req).ok_or_else(|| {
        error!("❌ Unauthenticated request to /auth/sync");
        ServiceError::Unauthenticated
    })?;

    info!("🔑 Sync request for subject: {}", claims.sub);

    let user = identity_service::resolve_or_create_user(
        state.get_ref(),
        &claims.sub,
        &claims.email,
        ProfileFields::from(&claims),
    )?;

    Ok(HttpResponse::Ok().json(user))
}

// Current user together with their teams
#[get("/auth/me")]
async fn me(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ServiceError> {
    let state = state.get_ref();
    let profile = retry_read(state.config.read_retry_attempts, || {
        let user = current_user(state, &req)?;
        user_service::get_profile(state, user)
    })
    .await?;

    Ok(HttpResponse::Ok().json(profile))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(sync_user).service(me);
}
