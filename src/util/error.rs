use axum::{response::{IntoResponse, Response}, http::StatusCode};
use serde::Serialize;
use tracing::error;

use crate::repository::repository_error::RepositoryError;

#[derive(Debug, Serialize)]
pub enum HandlerErrorKind {
    NotFound,
    Validation,
    Internal,
    Conflict,
    BadRequest,
}

impl std::fmt::Display for HandlerErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HandlerErrorKind::NotFound => "NotFound",
            HandlerErrorKind::Validation => "Validation",
            HandlerErrorKind::Internal => "Internal",
            HandlerErrorKind::Conflict => "Conflict",
            HandlerErrorKind::BadRequest => "BadRequest",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Serialize)]
pub struct HandlerError {
    pub error: HandlerErrorKind,
    pub message: String,
    pub details: Option<String>,
}

impl HandlerError {
    pub fn bad_request<T: Into<String>>(msg: T) -> Self {
        HandlerError { error: HandlerErrorKind::BadRequest, message: msg.into(), details: None }
    }

    pub fn validation<T: Into<String>>(msg: T, details: Option<String>) -> Self {
        HandlerError { error: HandlerErrorKind::Validation, message: msg.into(), details }
    }
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for HandlerError {}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = match self.error {
            HandlerErrorKind::NotFound => StatusCode::NOT_FOUND,
            HandlerErrorKind::Validation | HandlerErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            HandlerErrorKind::Conflict => StatusCode::CONFLICT,
            HandlerErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = axum::Json(self);
        (status, body).into_response()
    }
}

/// Input the quote workflow refuses before touching storage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Email is required")]
    MissingEmail,
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingRequiredFields(Vec<&'static str>),
    #[error("Admin quotes must be created as COMPLETE")]
    AdminRequiresComplete,
    #[error("Liquor liability requires a liability coverage option")]
    LiquorRequiresLiability,
    #[error("Policyholder must accept the legal notices before completing the quote")]
    LegalNoticesRequired,
    #[error("Quote number is required")]
    MissingQuoteNumber,
    #[error("{0}")]
    InvalidInput(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("Not Found: {0}")]
    NotFound(String),
    /// The quote cannot become a policy yet.
    #[error("Not eligible: {0}")]
    NotEligible(String),
    #[error("Could not generate a unique {field} after {attempts} attempts")]
    ExhaustedRetries { field: &'static str, attempts: usize },
    /// Stored data contradicts itself, e.g. a quote whose user row is gone.
    #[error("Integrity error: {0}")]
    Integrity(String),
    #[error("Internal Error: {0}")]
    InternalError(String),
}

impl ServiceError {
    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        ServiceError::NotFound(msg.into())
    }

    pub fn integrity<T: Into<String>>(msg: T) -> Self {
        ServiceError::Integrity(msg.into())
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => ServiceError::NotFound(msg),
            RepositoryError::ValidationError(msg) => {
                ServiceError::Validation(ValidationError::InvalidInput(msg))
            }
            RepositoryError::DuplicateKey { field, message } => {
                ServiceError::InternalError(format!("unexpected duplicate on {}: {}", field, message))
            }
            RepositoryError::DatabaseError(msg) => ServiceError::InternalError(msg),
            RepositoryError::ConnectionError(msg) => ServiceError::InternalError(msg),
            RepositoryError::SerializationError(msg) => ServiceError::InternalError(msg),
            RepositoryError::Generic(e) => ServiceError::InternalError(e.to_string()),
        }
    }
}

impl From<ServiceError> for HandlerError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(e) => HandlerError {
                error: HandlerErrorKind::Validation,
                message: e.to_string(),
                details: None,
            },
            ServiceError::NotFound(msg) => HandlerError {
                error: HandlerErrorKind::NotFound,
                message: "Resource not found".to_string(),
                details: Some(msg),
            },
            ServiceError::NotEligible(msg) => HandlerError {
                error: HandlerErrorKind::Conflict,
                message: "Quote is not eligible for conversion".to_string(),
                details: Some(msg),
            },
            other => {
                error!("Request failed: {}", other);
                HandlerError {
                    error: HandlerErrorKind::Internal,
                    message: "Internal server error".to_string(),
                    details: Some(other.to_string()),
                }
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        HandlerError::from(self).into_response()
    }
}
