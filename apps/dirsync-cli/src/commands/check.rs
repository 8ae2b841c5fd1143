//! Check command - Test database and directory connectivity

use clap::Args;
use serde::Serialize;

use dirsync_connector_ldap::LdapGroupReader;
use dirsync_db::PgGroupStore;

use crate::config::{ldap_config_from_lookup, DatabaseConfig};
use crate::error::{CliError, CliResult};

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Result of one connectivity check.
#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub name: &'static str,
    pub ok: bool,
    pub message: String,
}

impl CheckResult {
    fn pass(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            ok: true,
            message: message.into(),
        }
    }

    fn fail(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            ok: false,
            message: message.into(),
        }
    }
}

async fn check_database() -> CheckResult {
    let database = match DatabaseConfig::from_env() {
        Ok(database) => database,
        Err(e) => return CheckResult::fail("database", e.to_string()),
    };

    let store = match PgGroupStore::connect(&database.url, database.max_connections).await {
        Ok(store) => store,
        Err(e) => return CheckResult::fail("database", e.to_string()),
    };

    match store.ping().await {
        Ok(()) => CheckResult::pass("database", "Connected"),
        Err(e) => CheckResult::fail("database", e.to_string()),
    }
}

async fn check_directory() -> CheckResult {
    let config = match ldap_config_from_lookup(|key| std::env::var(key).ok()) {
        Ok(config) => config,
        Err(e) => return CheckResult::fail("directory", e.to_string()),
    };
    let group_dn = config.group_dn();

    let reader = match LdapGroupReader::new(config) {
        Ok(reader) => reader,
        Err(e) => return CheckResult::fail("directory", e.to_string()),
    };

    match reader.test_connection().await {
        Ok(()) => CheckResult::pass("directory", format!("Bound and found {group_dn}")),
        Err(e) => CheckResult::fail("directory", e.to_string()),
    }
}

/// Execute the check command
pub async fn execute(args: CheckArgs) -> CliResult<()> {
    let results = vec![check_database().await, check_directory().await];

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for result in &results {
            let status = if result.ok { "ok" } else { "FAILED" };
            println!("{:<10} {:<7} {}", result.name, status, result.message);
        }
    }

    let failed: Vec<&str> = results.iter().filter(|r| !r.ok).map(|r| r.name).collect();
    if failed.is_empty() {
        Ok(())
    } else {
        Err(CliError::CheckFailed(failed.join(", ")))
    }
}
