//! dirsync - reconcile directory groups into the local group store
//!
//! - `dirsync sync` runs one reconciliation pass
//! - `dirsync migrate` applies database migrations
//! - `dirsync check` tests database and directory connectivity

use clap::{Parser, Subcommand};

mod commands;
mod config;
mod error;
mod logging;

use error::CliResult;

/// dirsync - Directory group reconciliation
#[derive(Parser)]
#[command(name = "dirsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile directory groups into the local store
    Sync(commands::sync::SyncArgs),

    /// Apply database migrations
    Migrate(commands::migrate::MigrateArgs),

    /// Test database and directory connectivity
    Check(commands::check::CheckArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load .env file if present (development only)
    let _ = dotenvy::dotenv();

    match config::LoggingConfig::from_env() {
        Ok(logging_config) => logging::init_logging(&logging_config),
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    }

    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Sync(args) => commands::sync::execute(args).await,
        Commands::Migrate(args) => commands::migrate::execute(args).await,
        Commands::Check(args) => commands::check::execute(args).await,
    }
}
