//! Database-specific error types and conversions.

use flagtrail_core::error::FlagtrailError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query rejected: {0}")]
    Query(String),

    #[error("Invalid stored row: {0}")]
    InvalidRow(String),

    #[error("Payload encoding failed: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl From<DbError> for FlagtrailError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => FlagtrailError::NotFound { entity, id },
            DbError::Payload(e) => FlagtrailError::Serialization(e.to_string()),
            // A stored row that no longer decodes is corruption, not a query failure.
            DbError::InvalidRow(msg) => FlagtrailError::Internal(msg),
            other => FlagtrailError::Database(other.to_string()),
        }
    }
}
