//! Local group entities.
//!
//! A [`Group`] is the application's own record of a group. Groups created by
//! reconciliation are flagged `is_directory_managed` and carry the
//! directory's identifier; locally-created groups do not and are never
//! touched by reconciliation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{GroupId, MappingId};

/// A local group entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Store-assigned identifier.
    pub id: GroupId,
    /// Directory identifier, set once the group is directory-managed.
    pub directory_id: Option<String>,
    /// Short code (account name).
    pub code: String,
    /// Display title. Never empty for directory-managed groups.
    pub title: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Distinguished name as of the last sync.
    pub distinguished_name: Option<String>,
    /// When reconciliation last wrote this group.
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Whether reconciliation owns this group.
    pub is_directory_managed: bool,
}

impl Group {
    /// A fresh, not yet persisted group for a directory identifier.
    ///
    /// Fields other than the identifiers are filled in by the first sync.
    #[must_use]
    pub fn for_directory(id: GroupId, directory_id: impl Into<String>) -> Self {
        Self {
            id,
            directory_id: Some(directory_id.into()),
            code: String::new(),
            title: String::new(),
            description: None,
            distinguished_name: None,
            last_synced_at: None,
            is_directory_managed: false,
        }
    }

    /// A locally administered group unrelated to the directory.
    pub fn local(code: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: GroupId::new(),
            directory_id: None,
            code: code.into(),
            title: title.into(),
            description: None,
            distinguished_name: None,
            last_synced_at: None,
            is_directory_managed: false,
        }
    }

    /// Reference used by the destructive scan, if this group is directory-managed.
    #[must_use]
    pub fn managed_ref(&self) -> Option<ManagedGroupRef> {
        if !self.is_directory_managed {
            return None;
        }
        self.directory_id.as_ref().map(|directory_id| ManagedGroupRef {
            id: self.id,
            directory_id: directory_id.clone(),
        })
    }
}

/// Binds a group to a distinguished name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMapping {
    /// Mapping identifier.
    pub id: MappingId,
    /// Owning group; `None` until the mapping is attached.
    pub group_id: Option<GroupId>,
    /// Distinguished name this mapping binds.
    pub distinguished_name: String,
}

impl GroupMapping {
    /// An unattached mapping for a distinguished name.
    pub fn new(distinguished_name: impl Into<String>) -> Self {
        Self {
            id: MappingId::new(),
            group_id: None,
            distinguished_name: distinguished_name.into(),
        }
    }

    /// Whether this mapping binds exactly `dn`.
    #[must_use]
    pub fn matches(&self, dn: &str) -> bool {
        self.distinguished_name == dn
    }
}

/// The minimal projection of a directory-managed group read by the
/// destructive scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedGroupRef {
    /// Local identifier.
    pub id: GroupId,
    /// Directory identifier.
    pub directory_id: String,
}
