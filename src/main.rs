// teamspace-service/src/main.rs
use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use log::{error, info, warn};
use std::io;
use std::time::Duration;

use teamspace_service::config::Config;
use teamspace_service::routes;
use teamspace_service::services::identity_service;
use teamspace_service::state::AppState;
use teamspace_service::utils::Auth;

const LOCK_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env();
    let address = config.bind_address.clone();
    let jwt_secret = config.jwt_secret.clone();

    let state = AppState::new(config).map_err(|e| {
        error!("❌ Failed to open store: {}", e);
        io::Error::new(io::ErrorKind::Other, e.to_string())
    })?;

    match identity_service::provision_initial_superuser(
        &state.db,
        state.config.initial_superuser_email.as_deref(),
    ) {
        Ok(Some(user)) => info!("👑 Startup provisioning promoted user: {}", user.id),
        Ok(None) => {}
        Err(e) => warn!("⚠️ Superuser provisioning skipped: {}", e),
    }

    let state = web::Data::new(state);

    let locks = state.locks.clone();
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(LOCK_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = locks.cleanup_idle_locks() {
                error!("❌ Team lock cleanup failed: {}", e);
            }
        }
    });

    info!("🚀 Server started at {}", address);

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(Auth::new(jwt_secret.clone()))
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(routes::configure)
    })
    .bind(address)?
    .run()
    .await
}
