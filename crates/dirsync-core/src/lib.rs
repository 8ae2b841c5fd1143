//! dirsync Core Library
//!
//! Shared domain types for directory group reconciliation.
//!
//! # Modules
//!
//! - [`ids`] - Strongly typed local identifiers (`GroupId`, `MappingId`)
//! - [`record`] - Directory group records and record validation
//! - [`group`] - Local `Group` and `GroupMapping` entities
//! - [`snapshot`] - Items and errors produced by snapshot readers
//!
//! # Example
//!
//! ```
//! use dirsync_core::DirectoryGroupRecord;
//!
//! let record = DirectoryGroupRecord::new("g1", "eng", "CN=Engineering,OU=Groups")
//!     .with_display_name("Engineering");
//! assert!(record.validate().is_ok());
//! ```

pub mod group;
pub mod ids;
pub mod record;
pub mod snapshot;

pub use group::{Group, GroupMapping, ManagedGroupRef};
pub use ids::{GroupId, MappingId, ParseIdError};
pub use record::{DirectoryGroupRecord, MalformedRecordError};
pub use snapshot::{SnapshotError, SnapshotItem};
