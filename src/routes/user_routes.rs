// teamspace-service/src/routes/user_routes.rs
use actix_web::{delete, get, put, web, HttpRequest, HttpResponse};
use log::info;

use crate::models::{
    NotificationSettings, SearchQuery, ServiceError, UpdateAvatarRequest, UpdateProfileRequest,
};
use crate::routes::current_user;
use crate::services::{team_service, user_service};
use crate::state::AppState;
use crate::utils::retry_read;

#[get("/users/search")]
async fn search_users(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, ServiceError> {
    let state = state.get_ref();
    let users = retry_read(state.config.read_retry_attempts, || {
        current_user(state, &req)?;
        user_service::search_users(state, &query.query, query.limit)
    })
    .await?;

    Ok(HttpResponse::Ok().json(users))
}

#[get("/users/{user_id}")]
async fn get_user(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let state = state.get_ref();
    let user_id = path.into_inner();
    let user = retry_read(state.config.read_retry_attempts, || {
        current_user(state, &req)?;
        user_service::get_user_by_id(state, &user_id)
    })
    .await?;

    Ok(HttpResponse::Ok().json(user))
}

#[get("/users/{user_id}/teams")]
async fn get_user_teams(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let state = state.get_ref();
    let user_id = path.into_inner();
    let teams = retry_read(state.config.read_retry_attempts, || {
        let actor = current_user(state, &req)?;
        user_service::get_user_teams(state, &actor, &user_id)
    })
    .await?;

    Ok(HttpResponse::Ok().json(teams))
}

#[get("/me/teams")]
async fn my_teams(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ServiceError> {
    let state = state.get_ref();
    let teams = retry_read(state.config.read_retry_attempts, || {
        let actor = current_user(state, &req)?;
        team_service::list_teams(state, &actor)
    })
    .await?;

    Ok(HttpResponse::Ok().json(teams))
}

#[put("/me/profile")]
async fn update_profile(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, ServiceError> {
    let user = current_user(&state, &req)?;
    info!("📝 Updating profile for user: {}", user.id);
    let user = user_service::update_profile(&state, user, body.into_inner())?;
    Ok(HttpResponse::Ok().json(user))
}

#[put("/me/notifications")]
async fn update_notifications(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<NotificationSettings>,
) -> Result<HttpResponse, ServiceError> {
    let user = current_user(&state, &req)?;
    let user = user_service::update_notification_settings(&state, user, body.into_inner())?;
    Ok(HttpResponse::Ok().json(user.settings.notifications))
}

#[put("/me/avatar")]
async fn update_avatar(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<UpdateAvatarRequest>,
) -> Result<HttpResponse, ServiceError> {
    let user = current_user(&state, &req)?;
    let user = user_service::update_avatar(&state, user, &body.avatar_url)?;
    Ok(HttpResponse::Ok().json(user))
}

#[delete("/me/avatar")]
async fn delete_avatar(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ServiceError> {
    let user = current_user(&state, &req)?;
    let user = user_service::delete_avatar(&state, user)?;
    Ok(HttpResponse::Ok().json(user))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    // `/users/search` must be registered ahead of `/users/{user_id}`
    cfg.service(search_users)
        .service(get_user)
        .service(get_user_teams)
        .service(my_teams)
        .service(update_profile)
        .service(update_notifications)
        .service(update_avatar)
        .service(delete_avatar);
}
