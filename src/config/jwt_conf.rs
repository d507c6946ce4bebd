use std::env;
use tracing::{debug, error, info, warn};

use crate::config::ConfigError;

const MIN_SECRET_LEN: usize = 32;

/// JWT configuration structure
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// JWT secret key for signing tokens
    pub jwt_secret: String,
    /// Access token expiration time in minutes
    pub access_token_expiration: i64,
    /// Refresh token expiration time in minutes
    pub refresh_token_expiration: i64,
}

impl JwtConfig {
    /// Load JWT configuration from environment variables
    ///
    /// Expected environment variables:
    /// - JWT_SECRET: Secret key for signing JWT tokens (required, >= 32 chars)
    /// - JWT_ACCESS_TOKEN_EXPIRY: Access token expiration in minutes (defaults to 60)
    /// - JWT_REFRESH_TOKEN_EXPIRY: Refresh token expiration in minutes (defaults to 10080 = 1 week)
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading JWT configuration from environment variables");

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| {
            error!("JWT_SECRET environment variable not found");
            ConfigError::EnvVarNotFound("JWT_SECRET".to_string())
        })?;
        debug!("JWT secret loaded (length: {} chars)", jwt_secret.len());

        let access_token_expiration = minutes_var("JWT_ACCESS_TOKEN_EXPIRY", 60)?;
        let refresh_token_expiration = minutes_var("JWT_REFRESH_TOKEN_EXPIRY", 10080)?;

        let config = JwtConfig {
            jwt_secret,
            access_token_expiration,
            refresh_token_expiration,
        };
        config.validate()?;
        info!("JWT configuration loaded successfully");
        Ok(config)
    }

    /// Validate the JWT configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.len() < MIN_SECRET_LEN {
            error!("JWT secret is too short (minimum {} characters required)", MIN_SECRET_LEN);
            return Err(ConfigError::ValidationError(format!(
                "JWT secret must be at least {} characters long",
                MIN_SECRET_LEN
            )));
        }

        if self.access_token_expiration <= 0 || self.refresh_token_expiration <= 0 {
            return Err(ConfigError::ValidationError(
                "Token expiration must be greater than 0".to_string(),
            ));
        }

        if self.access_token_expiration >= self.refresh_token_expiration {
            warn!("Access token expiration is greater than or equal to refresh token expiration");
        }
        Ok(())
    }
}

fn minutes_var(key: &str, default: i64) -> Result<i64, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.parse::<i64>().map_err(|e| {
            error!("Invalid {} value: {}", key, e);
            ConfigError::InvalidValue(format!("{}: {}", key, e))
        }),
        Err(_) => {
            warn!("{} not set, using default: {} minutes", key, default);
            Ok(default)
        }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        JwtConfig {
            jwt_secret: "test_secret_key_for_jwt_testing_should_be_long_enough_for_security_purposes".to_string(),
            access_token_expiration: 60,
            refresh_token_expiration: 10080,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(JwtConfig::default().validate().is_ok());
    }

    #[test]
    fn test_short_secret_rejected() {
        let config = JwtConfig { jwt_secret: "short".to_string(), ..JwtConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_positive_expiry_rejected() {
        let config = JwtConfig { access_token_expiration: 0, ..JwtConfig::default() };
        assert!(config.validate().is_err());
    }
}
