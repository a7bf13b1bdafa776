use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, error, info, warn};

use crate::config::ConfigError;

/// SMTP settings for customer notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// Empty together with `smtp_password` for an unauthenticated relay.
    pub smtp_username: String,
    pub smtp_password: String,
    pub use_tls: bool,
    pub use_starttls: bool,
    pub from_email: String,
    /// Display name on outgoing mail
    pub from_name: String,
    pub connection_timeout_secs: u64,
}

impl EmailConfig {
    /// Loads SMTP settings, or `None` when `SMTP_HOST` is unset and
    /// notifications are switched off.
    pub fn from_env_optional() -> Result<Option<Self>, ConfigError> {
        if env::var("SMTP_HOST").map(|h| h.trim().is_empty()).unwrap_or(true) {
            warn!("SMTP_HOST not set, customer notifications are disabled");
            return Ok(None);
        }
        Self::from_env().map(Some)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading email configuration from environment variables");

        let smtp_host = env::var("SMTP_HOST")
            .map_err(|_| {
                error!("SMTP_HOST environment variable not found");
                ConfigError::EnvVarNotFound("SMTP_HOST".to_string())
            })?;
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

        let smtp_username = env::var("SMTP_USERNAME").unwrap_or_default();
        let smtp_password = env::var("SMTP_PASSWORD").unwrap_or_default();
        debug!("SMTP username: {}, password: [REDACTED]", smtp_username);

        let use_tls = env::var("SMTP_USE_TLS")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(true);
        let use_starttls = env::var("SMTP_USE_STARTTLS")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(true);

        let from_email = env::var("SMTP_FROM_EMAIL")
            .map_err(|_| {
                error!("SMTP_FROM_EMAIL environment variable not found");
                ConfigError::EnvVarNotFound("SMTP_FROM_EMAIL".to_string())
            })?;

        let from_name = env::var("SMTP_FROM_NAME").unwrap_or_else(|_| "Eventsure".to_string());

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

    pub fn from_test_env() -> Self {
        EmailConfig {
            smtp_host: "localhost".to_string(),
            smtp_port: 1025,
            smtp_username: "test".to_string(),
            smtp_password: "test".to_string(),
            use_tls: false,
            use_starttls: false,
            from_email: "quotes@example.com".to_string(),
            from_name: "Eventsure Test".to_string(),
            connection_timeout_secs: 10,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.smtp_host.is_empty() {
            return Err(ConfigError::ValidationError("SMTP host cannot be empty".to_string()));
        }
        if self.smtp_port == 0 {
            return Err(ConfigError::ValidationError("SMTP port cannot be 0".to_string()));
        }
        if self.smtp_username.is_empty() != self.smtp_password.is_empty() {
            error!("SMTP credentials are half configured");
            return Err(ConfigError::ValidationError(
                "SMTP username and password must be set together".to_string(),
            ));
        }
        if !self.from_email.contains('@') {
            return Err(ConfigError::ValidationError("Invalid from email format".to_string()));
        }
        if self.connection_timeout_secs == 0 {
            return Err(ConfigError::ValidationError("Connection timeout cannot be 0".to_string()));
        }
        Ok(())
    }

    pub fn has_credentials(&self) -> bool {
        !self.smtp_username.is_empty()
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        EmailConfig {
            smtp_host: "localhost".to_string(),
            smtp_port: 587,
            smtp_username: "".to_string(),
            smtp_password: "".to_string(),
            use_tls: true,
            use_starttls: true,
            from_email: "quotes@eventsure.local".to_string(),
            from_name: "Eventsure".to_string(),
            connection_timeout_secs: 30,
        }
    }
}
