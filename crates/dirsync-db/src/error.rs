//! Error types for the dirsync-db crate.
//!
//! Provides a unified error type that wraps `SQLx` errors with additional context.

use thiserror::Error;

/// Store operation errors.
///
/// # Example
///
/// ```rust
/// use dirsync_db::StoreError;
///
/// fn handle_error(err: StoreError) {
///     match err {
///         StoreError::RunInProgress { scope } => eprintln!("busy: {scope}"),
///         other => eprintln!("store error: {other}"),
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to establish or acquire a database connection.
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[source] sqlx::Error),

    /// A database migration failed to apply.
    #[error("Migration failed: {0}")]
    MigrationFailed(#[source] sqlx::migrate::MigrateError),

    /// A database query failed to execute.
    #[error("Query failed: {0}")]
    QueryFailed(#[source] sqlx::Error),

    /// The entity to update or delete does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The write would break a uniqueness constraint.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Another reconciliation run holds the run lock.
    #[error("Another reconciliation run is in progress for '{scope}'")]
    RunInProgress { scope: String },

    /// Any other backend failure.
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Create a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::not_found("group 42");
        assert_eq!(err.to_string(), "Not found: group 42");

        let err = StoreError::RunInProgress {
            scope: "ldap://dc1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Another reconciliation run is in progress for 'ldap://dc1'"
        );
    }
}
