use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, error, info, warn};

use crate::config::ConfigError;

/// Email configuration for SMTP settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP username for authentication
    pub smtp_username: String,
    /// SMTP password for authentication
    pub smtp_password: String,
    /// Whether to use TLS encryption
    pub use_tls: bool,
    /// Whether to use STARTTLS
    pub use_starttls: bool,
    /// From email address
    pub from_email: String,
    /// From name (display name)
    pub from_name: String,
    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,
}

impl EmailConfig {
    /// Create EmailConfig from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading email configuration from environment variables");

        let smtp_host = required_var("SMTP_HOST")?;
        debug!("SMTP host: {}", smtp_host);

        let smtp_port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| {
                warn!("SMTP_PORT not set, defaulting to 587");
                "587".to_string()
            })
            .parse::<u16>()
            .map_err(|_| {
                error!("Invalid SMTP_PORT value");
                ConfigError::InvalidValue("Invalid SMTP_PORT value".to_string())
            })?;

        let smtp_username = required_var("SMTP_USERNAME")?;
        let smtp_password = required_var("SMTP_PASSWORD")?;
        debug!("SMTP password: [REDACTED]");

        let use_tls = env::var("SMTP_USE_TLS")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(true);
        let use_starttls = env::var("SMTP_USE_STARTTLS")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(true);
        debug!("SMTP use TLS: {}, STARTTLS: {}", use_tls, use_starttls);

        let from_email = env::var("SMTP_FROM_EMAIL").unwrap_or_else(|_| smtp_username.clone());
        let from_name = env::var("SMTP_FROM_NAME").unwrap_or_else(|_| {
            warn!("SMTP_FROM_NAME not set, using default");
            "Service Bodies".to_string()
        });

        let connection_timeout_secs = env::var("SMTP_CONNECTION_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        let config = EmailConfig {
            smtp_host,
            smtp_port,
            smtp_username,
            smtp_password,
            use_tls,
            use_starttls,
            from_email,
            from_name,
            connection_timeout_secs,
        };

        config.validate()?;
        info!("Email configuration loaded successfully");
        Ok(config)
    }

    /// Like [`EmailConfig::from_env`], but a missing SMTP host or credential is
    /// reported as `Ok(None)`: email is then disabled rather than fatal.
    pub fn from_env_optional() -> Result<Option<Self>, ConfigError> {
        let configured = ["SMTP_HOST", "SMTP_USERNAME", "SMTP_PASSWORD"]
            .iter()
            .all(|key| env::var(key).map(|v| !v.trim().is_empty()).unwrap_or(false));
        if !configured {
            warn!("SMTP credentials not configured, outgoing email is disabled");
            return Ok(None);
        }
        Self::from_env().map(Some)
    }

    /// Create EmailConfig for testing
    pub fn from_test_env() -> Self {
        EmailConfig {
            smtp_host: "localhost".to_string(),
            smtp_port: 1025,
            smtp_username: "test".to_string(),
            smtp_password: "test".to_string(),
            use_tls: false,
            use_starttls: false,
            from_email: "test@example.com".to_string(),
            from_name: "Test App".to_string(),
            connection_timeout_secs: 10,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.smtp_host.is_empty() {
            return Err(ConfigError::ValidationError("SMTP host cannot be empty".to_string()));
        }

        if self.smtp_port == 0 {
            return Err(ConfigError::ValidationError("SMTP port cannot be 0".to_string()));
        }

        if self.smtp_username.is_empty() || self.smtp_password.is_empty() {
            return Err(ConfigError::ValidationError(
                "SMTP username and password cannot be empty".to_string(),
            ));
        }

        if self.from_email.is_empty() || !self.from_email.contains('@') {
            error!("Invalid from email format");
            return Err(ConfigError::ValidationError("Invalid from email format".to_string()));
        }

        if self.connection_timeout_secs == 0 {
            return Err(ConfigError::ValidationError("Connection timeout cannot be 0".to_string()));
        }

        Ok(())
    }

    /// Get SMTP server URL
    pub fn get_smtp_url(&self) -> String {
        format!("{}:{}", self.smtp_host, self.smtp_port)
    }
}

fn required_var(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| {
        error!("{} environment variable not found", key);
        ConfigError::EnvVarNotFound(key.to_string())
    })
}

impl Default for EmailConfig {
    fn default() -> Self {
        EmailConfig {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            smtp_username: "".to_string(),
            smtp_password: "".to_string(),
            use_tls: true,
            use_starttls: true,
            from_email: "noreply@example.com".to_string(),
            from_name: "Service Bodies".to_string(),
            connection_timeout_secs: 30,
        }
    }
}
