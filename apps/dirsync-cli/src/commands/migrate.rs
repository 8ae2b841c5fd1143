//! Migrate command - Apply database migrations

use clap::Args;
use tracing::info;

use dirsync_db::{run_migrations, PgGroupStore};

use crate::config::DatabaseConfig;
use crate::error::CliResult;

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {}

/// Execute the migrate command
pub async fn execute(_args: MigrateArgs) -> CliResult<()> {
    let database = DatabaseConfig::from_env()?;
    let store = PgGroupStore::connect(&database.url, database.max_connections).await?;

    run_migrations(store.pool()).await?;

    info!("Database migrations applied");
    println!("Migrations applied");
    Ok(())
}
