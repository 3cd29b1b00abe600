//! Error types for record store operations

use thiserror::Error;

/// Record store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization of a JSON column failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A referenced record does not exist
    #[error("{kind} '{id}' not found")]
    NotFound {
        /// Record kind (agent, superpower, document)
        kind: &'static str,
        /// Requested id
        id: String,
    },

    /// Upload rejected before it reached the database
    #[error("Invalid document '{name}': {reason}")]
    InvalidDocument {
        /// Document name as uploaded
        name: String,
        /// Why it was rejected
        reason: String,
    },
}
