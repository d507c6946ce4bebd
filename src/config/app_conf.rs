use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, info, warn};

use crate::config::ConfigError;

/// Paths that never reach the visitor tracker unless overridden.
pub const DEFAULT_TRACKER_EXCLUDED_PREFIXES: &[&str] =
    &["/api", "/admin", "/contacts", "/visitors", "/users", "/health"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "test" => Environment::Test,
            _ => Environment::Development,
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    /// Inbox that receives new-enquiry notifications
    pub admin_notification_email: Option<String>,
    pub site_name: String,
    pub tracker_excluded_prefixes: Vec<String>,
}

impl AppConfig {
    /// Expected environment variables:
    /// - APP_HOST (defaults to 127.0.0.1)
    /// - APP_PORT (defaults to 8080)
    /// - APP_ENV: development | production | test (defaults to development)
    /// - ADMIN_NOTIFICATION_EMAIL (optional, falls back to SMTP_FROM_EMAIL at dispatch time)
    /// - SITE_NAME (defaults to "Service Bodies")
    /// - TRACKER_EXCLUDED_PREFIXES: comma separated path prefixes
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading application configuration from environment variables");

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = match env::var("APP_PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidValue(format!("Invalid APP_PORT value: {}", raw)))?,
            Err(_) => {
                warn!("APP_PORT not set, defaulting to 8080");
                8080
            }
        };
        let environment = Environment::parse(&env::var("APP_ENV").unwrap_or_default());
        debug!("Application environment: {:?}", environment);

        let admin_notification_email = env::var("ADMIN_NOTIFICATION_EMAIL")
            .ok()
            .filter(|v| !v.trim().is_empty());
        let site_name = env::var("SITE_NAME").unwrap_or_else(|_| "Service Bodies".to_string());

        let tracker_excluded_prefixes = match env::var("TRACKER_EXCLUDED_PREFIXES") {
            Ok(raw) => parse_prefix_list(&raw),
            Err(_) => DEFAULT_TRACKER_EXCLUDED_PREFIXES.iter().map(|s| s.to_string()).collect(),
        };

        let config = AppConfig {
            host,
            port,
            environment,
            admin_notification_email,
            site_name,
            tracker_excluded_prefixes,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::ValidationError("APP_HOST cannot be empty".to_string()));
        }
        if let Some(ref email) = self.admin_notification_email {
            if !email.contains('@') {
                return Err(ConfigError::ValidationError(
                    "ADMIN_NOTIFICATION_EMAIL is not a valid address".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn from_test_env() -> Self {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: Environment::Test,
            admin_notification_email: Some("admin@example.com".to_string()),
            site_name: "Test Bodies".to_string(),
            tracker_excluded_prefixes: DEFAULT_TRACKER_EXCLUDED_PREFIXES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            environment: Environment::Development,
            admin_notification_email: None,
            site_name: "Service Bodies".to_string(),
            tracker_excluded_prefixes: DEFAULT_TRACKER_EXCLUDED_PREFIXES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

fn parse_prefix_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| if s.starts_with('/') { s.to_string() } else { format!("/{}", s) })
        .collect()
}
