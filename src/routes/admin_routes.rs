// teamspace-service/src/routes/admin_routes.rs
use actix_web::{delete, get, put, web, HttpRequest, HttpResponse};
use log::info;
use serde_json::json;

use crate::models::{ServiceError, SetSuperuserRequest, UpdateTeamRequest, User};
use crate::services::{admin_service, identity_service};
use crate::state::AppState;
use crate::utils::{get_identity_from_request, retry_read};

fn current_superuser(state: &AppState, req: &HttpRequest) -> Result<User, ServiceError> {
    let identity = get_identity_from_request(req);
    identity_service::require_superuser(&state.db, identity.as_ref())
}

#[get("/admin/users")]
async fn list_users(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ServiceError> {
    let state = state.get_ref();
    let users = retry_read(state.config.read_retry_attempts, || {
        let admin = current_superuser(state, &req)?;
        admin_service::list_all_users(state, &admin)
    })
    .await?;

    Ok(HttpResponse::Ok().json(users))
}

#[get("/admin/teams")]
async fn list_teams(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ServiceError> {
    let state = state.get_ref();
    let teams = retry_read(state.config.read_retry_attempts, || {
        let admin = current_superuser(state, &req)?;
        admin_service::list_all_teams(state, &admin)
    })
    .await?;

    Ok(HttpResponse::Ok().json(teams))
}

#[get("/admin/stats")]
async fn dashboard_stats(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ServiceError> {
    let state = state.get_ref();
    let stats = retry_read(state.config.read_retry_attempts, || {
        let admin = current_superuser(state, &req)?;
        admin_service::dashboard_stats(state, &admin)
    })
    .await?;

    Ok(HttpResponse::Ok().json(stats))
}

#[put("/admin/users/{user_id}/superuser")]
async fn set_superuser(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<SetSuperuserRequest>,
) -> Result<HttpResponse, ServiceError> {
    let admin = current_superuser(&state, &req)?;
    let user_id = path.into_inner();
    info!("👑 Setting superuser={} on user: {}", body.is_superuser, user_id);

    let user = admin_service::set_superuser(&state, &admin, &user_id, body.is_superuser)?;
    Ok(HttpResponse::Ok().json(user))
}

#[put("/admin/teams/{team_id}")]
async fn update_team(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<UpdateTeamRequest>,
) -> Result<HttpResponse, ServiceError> {
    let admin = current_superuser(&state, &req)?;
    let team = admin_service::admin_update_team(&state, &admin, &path.into_inner(), body.into_inner())?;
    Ok(HttpResponse::Ok().json(team))
}

#[delete("/admin/teams/{team_id}")]
async fn delete_team(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let admin = current_superuser(&state, &req)?;
    let team_id = path.into_inner();

    let report = admin_service::admin_delete_team(&state, &admin, &team_id)?;
    Ok(HttpResponse::Ok().json(json!({
        "team_id": team_id,
        "deleted_memberships": report.memberships,
        "deleted_files": report.files
    })))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_users)
        .service(list_teams)
        .service(dashboard_stats)
        .service(set_superuser)
        .service(update_team)
        .service(delete_team);
}
