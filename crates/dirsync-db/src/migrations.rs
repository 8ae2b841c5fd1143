//! Database migration management.
//!
//! Provides functions to run the versioned SQL migrations for the group store.

use sqlx::PgPool;

use crate::error::StoreError;

/// Run all pending database migrations.
///
/// Migrations are embedded at compile time from the `migrations/` directory
/// and applied in filename order.
///
/// # Example
///
/// ```rust,ignore
/// use dirsync_db::{run_migrations, PgGroupStore};
///
/// let store = PgGroupStore::connect("postgres://localhost/dirsync", 4).await?;
/// run_migrations(store.pool()).await?;
/// ```
///
/// # Errors
///
/// Returns `StoreError::MigrationFailed` if any migration fails to apply.
pub async fn run_migrations(pool: &PgPool) -> Result<(), StoreError> {
    tracing::info!("Running database migrations...");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(StoreError::MigrationFailed)?;

    tracing::info!("Migrations completed successfully");
    Ok(())
}
