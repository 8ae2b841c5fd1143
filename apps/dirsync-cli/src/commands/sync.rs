//! Sync command - Run one reconciliation pass

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Args;
use tracing::{info, warn};

use dirsync_connector_ldap::LdapGroupReader;
use dirsync_db::PgGroupStore;
use dirsync_reconcile::{ReconciliationEngine, RunSummary};

use crate::config::Config;
use crate::error::CliResult;

/// Arguments for the sync command
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Delete directory-managed groups that are no longer in the directory
    #[arg(long)]
    pub destructive: bool,

    /// Stop the run (between records) after this many seconds
    #[arg(long, value_name = "SECS")]
    pub max_run_secs: Option<u64>,

    /// Print the summary as compact JSON
    #[arg(long)]
    pub compact: bool,
}

/// Execute the sync command
pub async fn execute(args: SyncArgs) -> CliResult<()> {
    let config = Config::from_env()?;
    let destructive = args.destructive || config.run.destructive;
    let mut reconcile = config.run.reconcile.clone();
    if let Some(secs) = args.max_run_secs {
        reconcile.max_run_duration_secs = Some(secs);
    }

    let store = PgGroupStore::connect(&config.database.url, config.database.max_connections).await?;
    let scope = format!("{}/{}", config.ldap.url(), config.ldap.group_dn());
    let lock = store.try_acquire_run_lock(&scope).await?;

    let reader = LdapGroupReader::new(config.ldap.clone())?;
    let snapshot = match reader.snapshot().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            release(lock).await;
            return Err(e.into());
        }
    };

    let stop = Arc::new(AtomicBool::new(false));
    let signal = Arc::clone(&stop);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current record");
            signal.store(true, Ordering::SeqCst);
        }
    });

    info!(scope = %scope, destructive, "Running reconciliation");
    let engine = ReconciliationEngine::with_config(Arc::new(store), reconcile).with_stop_signal(stop);
    let result = engine.run(snapshot, destructive).await;
    release(lock).await;

    match result {
        Ok(summary) => {
            print_summary(&summary, args.compact)?;
            Ok(())
        }
        Err(failed) => {
            print_summary(&failed.summary, args.compact)?;
            Err(failed.into())
        }
    }
}

async fn release(lock: dirsync_db::RunLock) {
    if let Err(e) = lock.release().await {
        warn!(error = %e, "Failed to release run lock; it is dropped with its connection");
    }
}

fn print_summary(summary: &RunSummary, compact: bool) -> CliResult<()> {
    let json = if compact {
        serde_json::to_string(summary)?
    } else {
        serde_json::to_string_pretty(summary)?
    };
    println!("{json}");
    Ok(())
}
