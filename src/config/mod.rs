pub mod email_conf;
pub mod mongo_conf;
pub mod app_conf;

pub use email_conf::EmailConfig;
pub use mongo_conf::MongoConfig;
pub use app_conf::AppConfig;

/// Common configuration error type
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
    
    #[error("Validation error: {0}")]
    ValidationError(String),
}
