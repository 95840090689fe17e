// teamspace-service/src/services/mod.rs
pub mod admin_service;
pub mod authorization;
pub mod file_service;
pub mod identity_service;
pub mod quota_service;
pub mod team_service;
pub mod user_service;
