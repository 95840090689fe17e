// teamspace-service/src/routes/team_routes.rs
use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use log::info;
use serde_json::json;

use crate::models::{
    AddMemberRequest, ChangeRoleRequest, CreateTeamRequest, SearchQuery, ServiceError,
    UpdateTeamRequest,
};
use crate::routes::current_user;
use crate::services::{file_service, team_service};
use crate::state::AppState;
use crate::utils::retry_read;

// Create a new team owned by the caller
#[post("/teams")]
async fn create_team(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateTeamRequest>,
) -> Result<HttpResponse, ServiceError> {
    let user = current_user(&state, &req)?;
    info!("📝 Creating team: {} for user: {}", body.name, user.id);

    let team = team_service::create_team(&state, &user, body.into_inner())?;
    Ok(HttpResponse::Created().json(team))
}

#[get("/teams")]
async fn list_teams(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ServiceError> {
    let state = state.get_ref();
    let teams = retry_read(state.config.read_retry_attempts, || {
        let user = current_user(state, &req)?;
        team_service::list_teams(state, &user)
    })
    .await?;

    Ok(HttpResponse::Ok().json(teams))
}

#[get("/teams/search")]
async fn search_teams(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, ServiceError> {
    let state = state.get_ref();
    let teams = retry_read(state.config.read_retry_attempts, || {
        let user = current_user(state, &req)?;
        team_service::search_teams(state, &user, &query.query, query.limit)
    })
    .await?;

    Ok(HttpResponse::Ok().json(teams))
}

#[get("/teams/{team_id}")]
async fn get_team(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let state = state.get_ref();
    let team_id = path.into_inner();
    let team = retry_read(state.config.read_retry_attempts, || {
        let user = current_user(state, &req)?;
        team_service::get_team(state, &user, &team_id)
    })
    .await?;

    Ok(HttpResponse::Ok().json(team))
}

#[put("/teams/{team_id}")]
async fn update_team(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<UpdateTeamRequest>,
) -> Result<HttpResponse, ServiceError> {
    let user = current_user(&state, &req)?;
    let team_id = path.into_inner();
    info!("⚙️ Updating team: {} by user: {}", team_id, user.id);

    let team = team_service::update_team_settings(&state, &user, &team_id, body.into_inner())?;
    Ok(HttpResponse::Ok().json(team))
}

#[delete("/teams/{team_id}")]
async fn delete_team(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let user = current_user(&state, &req)?;
    let team_id = path.into_inner();
    info!("🗑️ Deleting team: {} by user: {}", team_id, user.id);

    let report = team_service::delete_team(&state, &user, &team_id)?;
    Ok(HttpResponse::Ok().json(json!({
        "team_id": team_id,
        "deleted_memberships": report.memberships,
        "deleted_files": report.files
    })))
}

#[get("/teams/{team_id}/members")]
async fn get_team_members(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let state = state.get_ref();
    let team_id = path.into_inner();
    let members = retry_read(state.config.read_retry_attempts, || {
        let user = current_user(state, &req)?;
        team_service::get_team_members(state, &user, &team_id)
    })
    .await?;

    Ok(HttpResponse::Ok().json(members))
}

#[post("/teams/{team_id}/members")]
async fn add_team_member(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<AddMemberRequest>,
) -> Result<HttpResponse, ServiceError> {
    let user = current_user(&state, &req)?;
    let team_id = path.into_inner();
    let target = body.target()?;
    info!("👥 Adding {:?} to team: {} as {}", target, team_id, body.role);

    let membership = team_service::add_member(&state, &user, &team_id, target, body.role)?;
    Ok(HttpResponse::Created().json(membership))
}

#[put("/teams/{team_id}/members/{user_id}")]
async fn change_member_role(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(String, String)>,
    body: web::Json<ChangeRoleRequest>,
) -> Result<HttpResponse, ServiceError> {
    let user = current_user(&state, &req)?;
    let (team_id, target_user_id) = path.into_inner();

    let membership =
        team_service::change_member_role(&state, &user, &team_id, &target_user_id, body.role)?;
    Ok(HttpResponse::Ok().json(membership))
}

#[delete("/teams/{team_id}/members/{user_id}")]
async fn remove_team_member(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ServiceError> {
    let user = current_user(&state, &req)?;
    let (team_id, target_user_id) = path.into_inner();

    team_service::remove_member(&state, &user, &team_id, &target_user_id)?;
    Ok(HttpResponse::NoContent().finish())
}

#[get("/teams/{team_id}/storage")]
async fn team_storage(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let state = state.get_ref();
    let team_id = path.into_inner();
    let summary = retry_read(state.config.read_retry_attempts, || {
        let user = current_user(state, &req)?;
        file_service::team_storage(state, &user, &team_id)
    })
    .await?;

    Ok(HttpResponse::Ok().json(summary))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    // `/teams/search` must be registered ahead of `/teams/{team_id}`
    cfg.service(create_team)
        .service(list_teams)
        .service(search_teams)
        .service(get_team)
        .service(update_team)
        .service(delete_team)
        .service(get_team_members)
        .service(add_team_member)
        .service(change_member_role)
        .service(remove_team_member)
        .service(team_storage);
}
