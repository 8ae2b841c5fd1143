//! # Group Store
//!
//! Persistence for reconciled groups.
//!
//! - [`GroupStore`] - the capability trait the reconciliation engine consumes
//! - [`InMemoryGroupStore`] - map-backed store for tests and dry runs
//! - [`PgGroupStore`] - PostgreSQL store with a streaming managed-group scan
//!   and an advisory [`RunLock`] for single-flight runs
//!
//! ## Example
//!
//! ```ignore
//! use dirsync_db::{run_migrations, GroupStore, PgGroupStore};
//!
//! let store = PgGroupStore::connect(&database_url, 4).await?;
//! run_migrations(store.pool()).await?;
//!
//! let lock = store.try_acquire_run_lock("ldap://dc1.example.com").await?;
//! let group = store.find_group_by_directory_id("g1").await?;
//! lock.release().await?;
//! ```

pub mod error;
pub mod memory;
pub mod migrations;
pub mod postgres;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryGroupStore;
pub use migrations::run_migrations;
pub use postgres::{PgGroupStore, RunLock};
pub use store::GroupStore;
