//! Run configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the reconciliation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Re-read each group's mappings after reconciling them and fail the run
    /// unless exactly one mapping with the current DN remains.
    #[serde(default = "default_verify_mapping_invariant")]
    pub verify_mapping_invariant: bool,
    /// Stop the run between records once it has been running this long.
    #[serde(default)]
    pub max_run_duration_secs: Option<u64>,
    /// Log running counters every N records (0 = never).
    #[serde(default = "default_progress_log_interval")]
    pub progress_log_interval: u64,
}

fn default_verify_mapping_invariant() -> bool {
    true
}

fn default_progress_log_interval() -> u64 {
    500
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            verify_mapping_invariant: default_verify_mapping_invariant(),
            max_run_duration_secs: None,
            progress_log_interval: default_progress_log_interval(),
        }
    }
}

impl ReconcileConfig {
    /// Set the run deadline.
    #[must_use]
    pub fn with_max_run_duration(mut self, secs: u64) -> Self {
        self.max_run_duration_secs = Some(secs);
        self
    }

    /// The run deadline as a duration.
    #[must_use]
    pub fn max_run_duration(&self) -> Option<Duration> {
        self.max_run_duration_secs.map(Duration::from_secs)
    }
}
