use thiserror::Error;

use crate::model::ResourceType;

pub type DatabaseResult<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("sqlx migrate error: {0}")]
    SqlxMigrateError(#[from] sqlx::migrate::MigrateError),
    #[error("sqlx error: {0}")]
    SqlxError(#[from] sqlx::Error),
    #[error("json error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("access to this resource is forbidden")]
    Forbidden,
    #[error("related resource not found: {0:?}")]
    NotFound(ResourceType),
    #[error("unique constraint violated: {0:?}")]
    Conflict(ResourceType),
    #[error("invariant violated on {resource_type:?}: {message}")]
    Invariant {
        resource_type: ResourceType,
        message: String,
    },
}

impl DatabaseError {
    pub fn invariant<S: Into<String>>(resource_type: ResourceType, message: S) -> Self {
        Self::Invariant {
            resource_type,
            message: message.into(),
        }
    }

    /// Turns a unique violation reported by postgres into [`DatabaseError::Conflict`].
    pub fn conflict_or(error: sqlx::Error, resource_type: ResourceType) -> Self {
        match &error {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::Conflict(resource_type),
            _ => Self::SqlxError(error),
        }
    }
}
