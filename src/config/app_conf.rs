use std::env;

use crate::config::ConfigError;

pub const DEFAULT_ADMIN_PATH_PREFIX: &str = "/admin";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// A create request whose referrer contains this path counts as an admin quote.
    pub admin_path_prefix: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);
        let admin_path_prefix = env::var("ADMIN_PATH_PREFIX")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ADMIN_PATH_PREFIX.to_string());
        AppConfig { host, port, admin_path_prefix }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::ValidationError("APP_PORT cannot be 0".to_string()));
        }
        if !self.admin_path_prefix.starts_with('/') {
            return Err(ConfigError::InvalidValue(format!(
                "ADMIN_PATH_PREFIX must start with '/': {}",
                self.admin_path_prefix
            )));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            admin_path_prefix: DEFAULT_ADMIN_PATH_PREFIX.to_string(),
        }
    }
}
