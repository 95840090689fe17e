// teamspace-service/src/routes/file_routes.rs
use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use log::info;

use crate::models::{
    CreateFileRequest, FileListQuery, MoveFileRequest, SearchQuery, ServiceError,
    UpdateFileRequest,
};
use crate::routes::current_user;
use crate::services::file_service;
use crate::state::AppState;
use crate::utils::retry_read;

#[get("/teams/{team_id}/files")]
async fn list_team_files(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<FileListQuery>,
) -> Result<HttpResponse, ServiceError> {
    let state = state.get_ref();
    let team_id = path.into_inner();
    let page = retry_read(state.config.read_retry_attempts, || {
        let user = current_user(state, &req)?;
        file_service::list_team_files(state, &user, &team_id, (*query).clone())
    })
    .await?;

    Ok(HttpResponse::Ok().json(page))
}

#[get("/teams/{team_id}/files/search")]
async fn search_team_files(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, ServiceError> {
    let state = state.get_ref();
    let team_id = path.into_inner();
    let files = retry_read(state.config.read_retry_attempts, || {
        let user = current_user(state, &req)?;
        file_service::search_team_files(state, &user, &team_id, &query.query, query.limit)
    })
    .await?;

    Ok(HttpResponse::Ok().json(files))
}

// Register metadata for an uploaded file
#[post("/teams/{team_id}/files")]
async fn create_file(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<CreateFileRequest>,
) -> Result<HttpResponse, ServiceError> {
    let user = current_user(&state, &req)?;
    let team_id = path.into_inner();
    info!("📤 Creating file: {} in team: {} for user: {}", body.name, team_id, user.id);

    let file = file_service::create_file(&state, &user, &team_id, body.into_inner())?;
    Ok(HttpResponse::Created().json(file))
}

#[get("/files/{file_id}")]
async fn get_file(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let state = state.get_ref();
    let file_id = path.into_inner();
    let file = retry_read(state.config.read_retry_attempts, || {
        let user = current_user(state, &req)?;
        file_service::get_file(state, &user, &file_id)
    })
    .await?;

    Ok(HttpResponse::Ok().json(file))
}

#[put("/files/{file_id}")]
async fn update_file(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<UpdateFileRequest>,
) -> Result<HttpResponse, ServiceError> {
    let user = current_user(&state, &req)?;
    let file = file_service::update_file(&state, &user, &path.into_inner(), body.into_inner())?;
    Ok(HttpResponse::Ok().json(file))
}

#[delete("/files/{file_id}")]
async fn delete_file(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let user = current_user(&state, &req)?;
    let file_id = path.into_inner();
    info!("🗑️ Deleting file: {} by user: {}", file_id, user.id);

    file_service::delete_file(&state, &user, &file_id)?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/files/{file_id}/move")]
async fn move_file(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<MoveFileRequest>,
) -> Result<HttpResponse, ServiceError> {
    let user = current_user(&state, &req)?;
    let file_id = path.into_inner();
    info!("📦 Moving file: {} to team: {}", file_id, body.target_team_id);

    let file = file_service::move_file(&state, &user, &file_id, &body.target_team_id)?;
    Ok(HttpResponse::Ok().json(file))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(search_team_files)
        .service(list_team_files)
        .service(create_file)
        .service(get_file)
        .service(update_file)
        .service(delete_file)
        .service(move_file);
}
