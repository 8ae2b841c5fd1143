//! Group store capability trait.
//!
//! The reconciliation engine talks to persistence only through
//! [`GroupStore`]. Implementations return plain data records; there is no
//! lazily loaded object graph behind a [`Group`].

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use dirsync_core::{Group, GroupId, GroupMapping, ManagedGroupRef};

use crate::error::StoreResult;

/// Persistence contract required by reconciliation.
///
/// Implementations may assume exclusive access for the duration of one run.
#[async_trait]
pub trait GroupStore: Send + Sync {
    /// Find the group carrying a directory identifier.
    async fn find_group_by_directory_id(&self, directory_id: &str) -> StoreResult<Option<Group>>;

    /// Instantiate a group for a directory identifier without persisting it.
    fn create_group(&self, directory_id: &str) -> Group {
        Group::for_directory(GroupId::new(), directory_id)
    }

    /// Insert or update a group.
    async fn save_group(&self, group: &Group) -> StoreResult<()>;

    /// All mappings owned by a group.
    async fn list_mappings(&self, group_id: GroupId) -> StoreResult<Vec<GroupMapping>>;

    /// Instantiate an unattached mapping without persisting it.
    fn create_mapping(&self, distinguished_name: &str) -> GroupMapping {
        GroupMapping::new(distinguished_name)
    }

    /// Persist `mapping` as owned by `group`, returning the stored mapping.
    async fn attach_mapping(&self, group: &Group, mapping: GroupMapping)
        -> StoreResult<GroupMapping>;

    /// Delete a mapping.
    async fn delete_mapping(&self, mapping: &GroupMapping) -> StoreResult<()>;

    /// Delete a group. Remaining mappings of the group are removed with it.
    async fn delete_group(&self, group_id: GroupId) -> StoreResult<()>;

    /// Lazily enumerate directory-managed groups.
    ///
    /// The stream must not load the full group set into memory and must
    /// tolerate `delete_mapping`/`delete_group` calls while it is being
    /// consumed.
    fn stream_directory_managed_groups(&self) -> BoxStream<'_, StoreResult<ManagedGroupRef>>;
}
