//! # Directory Group Reconciliation
//!
//! Brings a local group store in line with an authoritative directory.
//!
//! For every record of a snapshot the [`ReconciliationEngine`] creates or
//! updates the directory-managed group with the same directory id, then
//! leaves that group with exactly one mapping, for its current DN. In
//! destructive mode, managed groups whose directory id did not appear in the
//! snapshot are deleted afterwards. Groups not flagged as directory-managed
//! are never touched.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use dirsync_db::InMemoryGroupStore;
//! use dirsync_reconcile::ReconciliationEngine;
//!
//! let engine = ReconciliationEngine::new(Arc::new(InMemoryGroupStore::new()));
//! let summary = engine.run(reader.snapshot().await?, false).await?;
//! println!("{} groups processed", summary.processed_count);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod summary;
pub mod sync;

pub use config::ReconcileConfig;
pub use engine::ReconciliationEngine;
pub use error::{ReconcileError, RunFailed, RunPhase};
pub use summary::RunSummary;
pub use sync::apply_record;
