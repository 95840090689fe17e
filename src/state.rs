// teamspace-service/src/state.rs
use crate::config::Config;
use crate::models::ServiceError;
use crate::storage::Database;
use crate::utils::TeamLockRegistry;

// Shared by every worker through `web::Data<AppState>`
pub struct AppState {
    pub db: Database,
    pub locks: TeamLockRegistry,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, ServiceError> {
        Ok(Self {
            db: Database::from_config(&config)?,
            locks: TeamLockRegistry::new(),
            config,
        })
    }

    pub fn in_memory(config: Config) -> Self {
        Self {
            db: Database::in_memory(),
            locks: TeamLockRegistry::new(),
            config,
        }
    }
}
