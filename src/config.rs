// teamspace-service/src/config.rs
use log::warn;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_STORAGE_LIMIT: u64 = 5 * 1024 * 1024 * 1024; // 5GB
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024; // 100MB
const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:9090";
const DEFAULT_JWT_SECRET: &str = "teamspace_development_secret";
const DEFAULT_ALLOWED_FILE_TYPES: &str = "image/*,application/pdf";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub jwt_secret: String,
    pub data_dir: Option<PathBuf>,
    pub initial_superuser_email: Option<String>,
    pub default_storage_limit: u64,
    pub default_allowed_file_types: Vec<String>,
    pub max_file_size: u64,
    pub read_retry_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            data_dir: None,
            initial_superuser_email: None,
            default_storage_limit: DEFAULT_STORAGE_LIMIT,
            default_allowed_file_types: split_types(DEFAULT_ALLOWED_FILE_TYPES),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            read_retry_attempts: 3,
        }
    }
}

impl Config {
    // Read configuration from the environment (call dotenv first to pick up .env)
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            jwt_secret: env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            data_dir: non_empty_var("DATA_DIR").map(PathBuf::from),
            initial_superuser_email: non_empty_var("INITIAL_SUPERUSER_EMAIL"),
            default_storage_limit: parsed_var("DEFAULT_STORAGE_LIMIT", defaults.default_storage_limit),
            default_allowed_file_types: non_empty_var("DEFAULT_ALLOWED_FILE_TYPES")
                .map(|raw| split_types(&raw))
                .unwrap_or(defaults.default_allowed_file_types),
            max_file_size: parsed_var("MAX_FILE_SIZE", defaults.max_file_size),
            read_retry_attempts: parsed_var("READ_RETRY_ATTEMPTS", defaults.read_retry_attempts).max(1),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parsed_var<T: FromStr + Copy + std::fmt::Display>(name: &str, default: T) -> T {
    match non_empty_var(name) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("⚠️ Ignoring malformed {}='{}', using {}", name, raw, default);
            default
        }),
        None => default,
    }
}

fn split_types(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_types_are_split_and_trimmed() {
        assert_eq!(
            split_types(" image/* , application/pdf,,"),
            vec!["image/*".to_string(), "application/pdf".to_string()]
        );
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.default_storage_limit, 5_368_709_120);
        assert_eq!(config.max_file_size, 104_857_600);
        assert_eq!(config.bind_address, "127.0.0.1:9090");
        assert!(config.data_dir.is_none());
    }
}
