//! LDAP/Active Directory group snapshot reader.
//!
//! Reads every group object below a configured container with a paged
//! streaming search and maps each entry to a
//! [`DirectoryGroupRecord`](dirsync_core::DirectoryGroupRecord).
//!
//! # Example
//!
//! ```ignore
//! use dirsync_connector_ldap::{LdapConfig, LdapGroupReader};
//!
//! let config = LdapConfig::new("dc1.corp.example.com", "DC=corp,DC=example,DC=com", "CN=reader,OU=Service")
//!     .with_password("secret")
//!     .with_group_container("OU=Groups");
//! let reader = LdapGroupReader::new(config)?;
//! let snapshot = reader.snapshot().await?;
//! ```

pub mod attributes;
pub mod config;
pub mod error;
pub mod groups;
pub mod reader;

pub use attributes::{AttributeSet, AttributeValue};
pub use config::LdapConfig;
pub use error::{ConnectorError, ConnectorResult};
pub use groups::{group_sync_attributes, map_directory_group};
pub use reader::LdapGroupReader;
