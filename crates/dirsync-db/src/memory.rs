//! In-memory group store.
//!
//! Backs tests and dry runs. Groups and mappings live in ordered maps so the
//! managed-group stream can walk them with a keyset cursor, taking the lock
//! for a single step at a time.

use std::collections::BTreeMap;
use std::ops::Bound;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use tokio::sync::RwLock;

use dirsync_core::{Group, GroupId, GroupMapping, ManagedGroupRef, MappingId};

use crate::error::{StoreError, StoreResult};
use crate::store::GroupStore;

#[derive(Debug, Default)]
struct MemoryState {
    groups: BTreeMap<GroupId, Group>,
    mappings: BTreeMap<MappingId, GroupMapping>,
}

/// A [`GroupStore`] held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryGroupStore {
    state: RwLock<MemoryState>,
}

impl InMemoryGroupStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a group as-is, bypassing uniqueness checks.
    pub async fn insert_group(&self, group: Group) {
        self.state.write().await.groups.insert(group.id, group);
    }

    /// Insert a mapping for a group as-is.
    pub async fn insert_mapping(&self, group_id: GroupId, dn: &str) -> GroupMapping {
        let mut mapping = GroupMapping::new(dn);
        mapping.group_id = Some(group_id);
        self.state
            .write()
            .await
            .mappings
            .insert(mapping.id, mapping.clone());
        mapping
    }

    /// Snapshot of all groups.
    pub async fn groups(&self) -> Vec<Group> {
        self.state.read().await.groups.values().cloned().collect()
    }

    /// A group by local identifier.
    pub async fn group(&self, id: GroupId) -> Option<Group> {
        self.state.read().await.groups.get(&id).cloned()
    }

    /// Mappings owned by a group.
    pub async fn mappings_for(&self, group_id: GroupId) -> Vec<GroupMapping> {
        self.state
            .read()
            .await
            .mappings
            .values()
            .filter(|m| m.group_id == Some(group_id))
            .cloned()
            .collect()
    }

    /// Total number of stored mappings.
    pub async fn mapping_count(&self) -> usize {
        self.state.read().await.mappings.len()
    }
}

#[async_trait]
impl GroupStore for InMemoryGroupStore {
    async fn find_group_by_directory_id(&self, directory_id: &str) -> StoreResult<Option<Group>> {
        let state = self.state.read().await;

        // Prefer the directory-managed group when a local one shares the id.
        let mut fallback = None;
        for group in state
            .groups
            .values()
            .filter(|g| g.directory_id.as_deref() == Some(directory_id))
        {
            if group.is_directory_managed {
                return Ok(Some(group.clone()));
            }
            fallback.get_or_insert_with(|| group.clone());
        }

        Ok(fallback)
    }

    async fn save_group(&self, group: &Group) -> StoreResult<()> {
        let mut state = self.state.write().await;

        if group.is_directory_managed {
            if let Some(directory_id) = group.directory_id.as_deref() {
                let clash = state.groups.values().any(|g| {
                    g.id != group.id
                        && g.is_directory_managed
                        && g.directory_id.as_deref() == Some(directory_id)
                });
                if clash {
                    return Err(StoreError::Conflict(format!(
                        "directory id '{directory_id}' is already bound to another managed group"
                    )));
                }
            }
        }

        state.groups.insert(group.id, group.clone());
        Ok(())
    }

    async fn list_mappings(&self, group_id: GroupId) -> StoreResult<Vec<GroupMapping>> {
        Ok(self.mappings_for(group_id).await)
    }

    async fn attach_mapping(
        &self,
        group: &Group,
        mut mapping: GroupMapping,
    ) -> StoreResult<GroupMapping> {
        let mut state = self.state.write().await;
        if !state.groups.contains_key(&group.id) {
            return Err(StoreError::not_found(format!("group {}", group.id)));
        }
        mapping.group_id = Some(group.id);
        state.mappings.insert(mapping.id, mapping.clone());
        Ok(mapping)
    }

    async fn delete_mapping(&self, mapping: &GroupMapping) -> StoreResult<()> {
        match self.state.write().await.mappings.remove(&mapping.id) {
            Some(_) => Ok(()),
            None => Err(StoreError::not_found(format!("mapping {}", mapping.id))),
        }
    }

    async fn delete_group(&self, group_id: GroupId) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.groups.remove(&group_id).is_none() {
            return Err(StoreError::not_found(format!("group {group_id}")));
        }
        state.mappings.retain(|_, m| m.group_id != Some(group_id));
        Ok(())
    }

    fn stream_directory_managed_groups(&self) -> BoxStream<'_, StoreResult<ManagedGroupRef>> {
        stream::unfold(None::<GroupId>, move |cursor| async move {
            let state = self.state.read().await;
            let start = match cursor {
                Some(last) => Bound::Excluded(last),
                None => Bound::Unbounded,
            };
            let next = state
                .groups
                .range((start, Bound::Unbounded))
                .find_map(|(_, g)| g.managed_ref())?;
            let id = next.id;
            Some((Ok(next), Some(id)))
        })
        .boxed()
    }
}
