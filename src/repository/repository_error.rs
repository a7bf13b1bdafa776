use std::fmt;

#[derive(Debug)]
pub enum RepositoryError {
    NotFound(String),
    /// A unique index rejected the write. `field` names the indexed field.
    DuplicateKey { field: String, message: String },
    ValidationError(String),
    DatabaseError(String),
    ConnectionError(String),
    SerializationError(String),
    /// Generic error that wraps any error implementing std::error::Error
    Generic(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            RepositoryError::DuplicateKey { field, message } => {
                write!(f, "Duplicate Key on {}: {}", field, message)
            }
            RepositoryError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            RepositoryError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            RepositoryError::ConnectionError(msg) => write!(f, "Connection Error: {}", msg),
            RepositoryError::SerializationError(msg) => write!(f, "Serialization Error: {}", msg),
            RepositoryError::Generic(err) => write!(f, "Repository Error: {}", err),
        }
    }
}

impl std::error::Error for RepositoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RepositoryError::Generic(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

// Convenient constructors
impl RepositoryError {
    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        RepositoryError::NotFound(msg.into())
    }

    pub fn duplicate_key<F: Into<String>, T: Into<String>>(field: F, msg: T) -> Self {
        RepositoryError::DuplicateKey { field: field.into(), message: msg.into() }
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        RepositoryError::ValidationError(msg.into())
    }

    pub fn database<T: Into<String>>(msg: T) -> Self {
        RepositoryError::DatabaseError(msg.into())
    }

    pub fn connection<T: Into<String>>(msg: T) -> Self {
        RepositoryError::ConnectionError(msg.into())
    }

    /// True only for a unique violation on exactly this field.
    pub fn is_duplicate_on(&self, field: &str) -> bool {
        matches!(self, RepositoryError::DuplicateKey { field: f, .. } if f == field)
    }
}

/// Pulls the field name out of a MongoDB E11000 message, e.g.
/// `... index: quoteNumber_1 dup key: { ... }` gives `quoteNumber`.
pub fn duplicate_key_field(message: &str) -> Option<String> {
    let index = message.split("index: ").nth(1)?.split_whitespace().next()?;
    let field = match index.rsplit_once('_') {
        Some((name, direction)) if direction == "1" || direction == "-1" => name,
        _ => index,
    };
    // Compound indexes name every key; the first one identifies the constraint.
    let field = field.split("_1_").next().unwrap_or(field);
    if field.is_empty() {
        None
    } else {
        Some(field.to_string())
    }
}

// MongoDB-specific conversions
impl From<mongodb::error::Error> for RepositoryError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind;

        let err_msg = err.to_string();
        if err_msg.contains("E11000") {
            let field = duplicate_key_field(&err_msg).unwrap_or_else(|| "unknown".to_string());
            return RepositoryError::DuplicateKey { field, message: err_msg };
        }

        match err.kind.as_ref() {
            ErrorKind::Write(_) => RepositoryError::DatabaseError(format!("Write error: {}", err)),
            ErrorKind::Authentication { .. } => {
                RepositoryError::ConnectionError(format!("Authentication failed: {}", err))
            }
            ErrorKind::InvalidArgument { .. } => {
                RepositoryError::ValidationError(format!("Invalid argument: {}", err))
            }
            ErrorKind::Io(_) => RepositoryError::ConnectionError(format!("IO error: {}", err)),
            _ => RepositoryError::Generic(Box::new(err)),
        }
    }
}

// BSON serialization errors

impl From<bson::ser::Error> for RepositoryError {
    fn from(err: bson::ser::Error) -> Self {
        RepositoryError::SerializationError(format!("BSON serialization error: {}", err))
    }
}

impl From<bson::de::Error> for RepositoryError {
    fn from(err: bson::de::Error) -> Self {
        RepositoryError::SerializationError(format!("BSON deserialization error: {}", err))
    }
}

// Result type alias for convenience
pub type RepositoryResult<T> = Result<T, RepositoryError>;
