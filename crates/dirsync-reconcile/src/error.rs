//! Reconciliation error types.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use dirsync_core::GroupId;
use dirsync_db::StoreError;

use crate::summary::RunSummary;

/// Phase of a run an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Creating and updating groups from the snapshot.
    Sync,
    /// Deleting managed groups absent from the snapshot.
    DestructiveDelete,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPhase::Sync => write!(f, "sync"),
            RunPhase::DestructiveDelete => write!(f, "destructive_delete"),
        }
    }
}

/// A fatal reconciliation error.
///
/// Malformed records are not errors at this level; they are skipped and
/// counted in [`RunSummary::skipped_count`].
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The store failed to read or write.
    #[error(
        "persistence failure during {phase} (directory_id={}): {source}",
        .directory_id.as_deref().unwrap_or("unknown")
    )]
    Persistence {
        phase: RunPhase,
        directory_id: Option<String>,
        #[source]
        source: StoreError,
    },

    /// The store did not hold exactly one matching mapping after reconciliation.
    #[error(
        "mapping invariant violated for group {group_id} (directory_id={directory_id}): \
         expected one mapping for '{distinguished_name}', found {matching} of {total}"
    )]
    MappingInvariantViolation {
        directory_id: String,
        group_id: GroupId,
        distinguished_name: String,
        matching: usize,
        total: usize,
    },

    /// The snapshot source failed.
    #[error("directory snapshot failed: {message}")]
    Directory { message: String },

    /// The run was stopped between records.
    #[error("run interrupted during {phase}: {reason}")]
    Interrupted { phase: RunPhase, reason: String },
}

impl ReconcileError {
    pub(crate) fn persistence(
        phase: RunPhase,
        directory_id: Option<String>,
        source: StoreError,
    ) -> Self {
        Self::Persistence {
            phase,
            directory_id,
            source,
        }
    }

    /// Phase the error occurred in, when known.
    #[must_use]
    pub fn phase(&self) -> Option<RunPhase> {
        match self {
            Self::Persistence { phase, .. } | Self::Interrupted { phase, .. } => Some(*phase),
            Self::MappingInvariantViolation { .. } | Self::Directory { .. } => {
                Some(RunPhase::Sync)
            }
        }
    }

    /// Directory identifier of the record being processed, when known.
    #[must_use]
    pub fn directory_id(&self) -> Option<&str> {
        match self {
            Self::Persistence { directory_id, .. } => directory_id.as_deref(),
            Self::MappingInvariantViolation { directory_id, .. } => Some(directory_id),
            Self::Directory { .. } | Self::Interrupted { .. } => None,
        }
    }

    /// Get an error code for classification.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Persistence { .. } => "PERSISTENCE_ERROR",
            Self::MappingInvariantViolation { .. } => "MAPPING_INVARIANT_VIOLATION",
            Self::Directory { .. } => "DIRECTORY_ERROR",
            Self::Interrupted { .. } => "INTERRUPTED",
        }
    }
}

/// A run that stopped on a fatal error.
///
/// `summary` holds the counters up to the failure.
#[derive(Debug, Error)]
#[error("reconciliation run failed after {} processed records: {error}", .summary.processed_count)]
pub struct RunFailed {
    pub summary: RunSummary,
    #[source]
    pub error: ReconcileError,
}
