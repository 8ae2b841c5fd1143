//! Run summary and counters.

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Counters for one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Records reconciled (created + updated).
    #[serde(default)]
    pub processed_count: u64,
    /// Groups created.
    #[serde(default)]
    pub created_count: u64,
    /// Existing groups updated.
    #[serde(default)]
    pub updated_count: u64,
    /// Groups deleted by the destructive pass.
    #[serde(default)]
    pub deleted_count: u64,
    /// Malformed records skipped.
    #[serde(default)]
    pub skipped_count: u64,
    /// Mappings attached.
    #[serde(default)]
    pub mappings_created: u64,
    /// Mappings removed, including those of deleted groups.
    #[serde(default)]
    pub mappings_deleted: u64,
    /// Whether the run stopped early on a stop request or deadline.
    #[serde(default)]
    pub interrupted: bool,
    /// Wall-clock duration of the run.
    #[serde(default)]
    pub duration_seconds: f64,
}

impl RunSummary {
    /// Whether the run changed nothing but sync timestamps.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.created_count == 0
            && self.deleted_count == 0
            && self.mappings_created == 0
            && self.mappings_deleted == 0
    }
}

/// Accumulates counters while a run executes.
#[derive(Debug)]
pub(crate) struct RunTracker {
    summary: RunSummary,
    start_time: Instant,
}

impl RunTracker {
    pub(crate) fn start() -> Self {
        Self {
            summary: RunSummary::default(),
            start_time: Instant::now(),
        }
    }

    pub(crate) fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    pub(crate) fn record_created(&mut self) {
        self.summary.processed_count += 1;
        self.summary.created_count += 1;
    }

    pub(crate) fn record_updated(&mut self) {
        self.summary.processed_count += 1;
        self.summary.updated_count += 1;
    }

    pub(crate) fn record_skipped(&mut self) {
        self.summary.skipped_count += 1;
    }

    pub(crate) fn record_deleted(&mut self) {
        self.summary.deleted_count += 1;
    }

    pub(crate) fn record_mapping_created(&mut self) {
        self.summary.mappings_created += 1;
    }

    pub(crate) fn record_mapping_deleted(&mut self) {
        self.summary.mappings_deleted += 1;
    }

    pub(crate) fn mark_interrupted(&mut self) {
        self.summary.interrupted = true;
    }

    pub(crate) fn current(&self) -> &RunSummary {
        &self.summary
    }

    /// Stamp the duration and return the final summary.
    pub(crate) fn finish(mut self) -> RunSummary {
        self.summary.duration_seconds = self.start_time.elapsed().as_secs_f64();
        self.summary
    }
}
