//! Items produced by a directory snapshot reader.

use thiserror::Error;

use crate::record::{DirectoryGroupRecord, MalformedRecordError};

/// A failure while producing the next snapshot item.
#[derive(Debug, Clone, Error)]
pub enum SnapshotError {
    /// The entry was read but cannot be reconciled. The run continues.
    #[error(transparent)]
    Malformed(#[from] MalformedRecordError),

    /// The directory source itself failed. The run cannot continue.
    #[error("directory source failed: {message}")]
    Source { message: String },
}

impl SnapshotError {
    /// Create a source error.
    pub fn source(message: impl Into<String>) -> Self {
        Self::Source {
            message: message.into(),
        }
    }

    /// Whether the run may skip this item and continue.
    #[must_use]
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

/// One item of a snapshot stream.
pub type SnapshotItem = Result<DirectoryGroupRecord, SnapshotError>;
