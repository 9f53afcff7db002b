//! Storage error types.
//!
//! Backends report failures as [`StoreError`]. These never reach callers of
//! the record store contract: [`VaultStore`](crate::store::VaultStore) logs
//! them and converts them into the contract's result shapes. Only the
//! startup path (backend construction, connectivity, schema) sees them
//! directly.

/// Result type for backend operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Backend errors with structured context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// IO error with context.
    #[error("IO error in {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The JSON document could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Statement or connection error from PostgreSQL.
    #[error("postgres error: {0}")]
    Postgres(#[from] postgres::Error),

    /// No pooled connection could be obtained.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// A blocking task panicked or was cancelled.
    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The backend was shut down.
    #[error("store closed")]
    Closed,

    /// Backend configuration is unusable.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl StoreError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
