use serde::{Deserialize, Serialize};
use std::env;

use crate::config::ConfigError;

/// Credentials for the admin account seeded on first start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUserConfig {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl AdminUserConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let var = |key: &str| env::var(key).map_err(|_| ConfigError::EnvVarNotFound(key.to_string()));
        let config = AdminUserConfig {
            username: var("ADMIN_USERNAME")?,
            first_name: env::var("ADMIN_FIRST_NAME").unwrap_or_else(|_| "Site".to_string()),
            last_name: env::var("ADMIN_LAST_NAME").unwrap_or_else(|_| "Admin".to_string()),
            email: var("ADMIN_EMAIL")?.trim().to_lowercase(),
            password: var("ADMIN_PASSWORD")?,
        };
        if config.password.len() < 8 {
            return Err(ConfigError::ValidationError(
                "ADMIN_PASSWORD must be at least 8 characters".to_string(),
            ));
        }
        Ok(config)
    }
}
