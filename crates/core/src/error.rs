use thiserror::Error;

/// The error taxonomy surfaced to callers (§7 of the spec).
///
/// Cache failures never reach this type (they degrade silently, §4.2); bus
/// publish failures during ingestion degrade to local-only delivery and are
/// logged, not surfaced. Everything else that can fail a request ends up
/// here, and `strym-api` maps each variant to the `{"error": {...}}`
/// envelope and an HTTP status at the edge.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("{resource} '{id}' not found")]
    NotFound { resource: String, id: String },

    #[error("rate limit exceeded")]
    RateLimit { retry_after: u64 },

    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Machine-readable kind string used in the error envelope's `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "ValidationError",
            AppError::Authentication(_) => "AuthenticationError",
            AppError::NotFound { .. } => "NotFoundError",
            AppError::RateLimit { .. } => "RateLimitError",
            AppError::Database(_) => "DatabaseError",
            AppError::Internal(_) => "InternalError",
        }
    }
}
