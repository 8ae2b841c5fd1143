//! CLI error types and exit codes

use thiserror::Error;

use dirsync_connector_ldap::ConnectorError;
use dirsync_db::StoreError;
use dirsync_reconcile::{ReconcileError, RunFailed};

use crate::config::ConfigError;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: General error
/// - 2: Directory authentication failed
/// - 3: Connection error (database or directory)
/// - 4: Another run holds the run lock
/// - 5: Reconciliation run failed
/// - 130: Run interrupted
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Directory error: {0}")]
    Directory(#[from] ConnectorError),

    #[error("{0}")]
    RunFailed(#[from] RunFailed),

    #[error("Check failed: {0}")]
    CheckFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CliError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::Serialization(_) | CliError::CheckFailed(_) => 1,
            CliError::Store(StoreError::ConnectionFailed(_)) => 3,
            CliError::Store(StoreError::RunInProgress { .. }) => 4,
            CliError::Store(_) => 1,
            CliError::Directory(ConnectorError::AuthenticationFailed) => 2,
            CliError::Directory(e) if e.is_transient() => 3,
            CliError::Directory(_) => 1,
            CliError::RunFailed(failed) => match failed.error {
                ReconcileError::Interrupted { .. } => 130,
                _ => 5,
            },
        }
    }

    /// Print the error to stderr with appropriate formatting
    pub fn print(&self) {
        let use_color = std::env::var("NO_COLOR").is_err();

        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {self}");
        } else {
            eprintln!("Error: {self}");
        }

        if let Some(suggestion) = self.suggestion() {
            if use_color {
                eprintln!("\n\x1b[33mSuggestion:\x1b[0m {suggestion}");
            } else {
                eprintln!("\nSuggestion: {suggestion}");
            }
        }
    }

    /// Get a suggested action for this error
    fn suggestion(&self) -> Option<&'static str> {
        match self {
            CliError::Config(ConfigError::MissingVar(_)) => {
                Some("Set the variable in the environment or in a .env file.")
            }
            CliError::Store(StoreError::RunInProgress { .. }) => {
                Some("Wait for the running reconciliation to finish, then retry.")
            }
            CliError::Store(StoreError::MigrationFailed(_)) => {
                Some("Check database permissions and the migration history table.")
            }
            CliError::Directory(ConnectorError::AuthenticationFailed) => {
                Some("Check LDAP_BIND_DN and LDAP_BIND_PASSWORD.")
            }
            CliError::Directory(e) if e.is_transient() => {
                Some("Run 'dirsync check' to test directory connectivity.")
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirsync_reconcile::{RunPhase, RunSummary};

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            CliError::Directory(ConnectorError::AuthenticationFailed).exit_code(),
            2
        );
        assert_eq!(
            CliError::Directory(ConnectorError::connection_failed("refused")).exit_code(),
            3
        );
        assert_eq!(
            CliError::Store(StoreError::RunInProgress {
                scope: "ldap://dc1".to_string()
            })
            .exit_code(),
            4
        );
        assert_eq!(
            CliError::Config(ConfigError::MissingVar("DATABASE_URL".to_string())).exit_code(),
            1
        );
    }

    #[test]
    fn test_run_failed_exit_codes() {
        let interrupted = CliError::from(RunFailed {
            summary: RunSummary::default(),
            error: ReconcileError::Interrupted {
                phase: RunPhase::Sync,
                reason: "stop requested".to_string(),
            },
        });
        assert_eq!(interrupted.exit_code(), 130);

        let failed = CliError::from(RunFailed {
            summary: RunSummary::default(),
            error: ReconcileError::Directory {
                message: "connection reset".to_string(),
            },
        });
        assert_eq!(failed.exit_code(), 5);
    }
}
