//! Shared helpers for reconciliation tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, Stream};

use dirsync_core::{
    DirectoryGroupRecord, Group, GroupId, GroupMapping, ManagedGroupRef, SnapshotItem,
};
use dirsync_db::{GroupStore, InMemoryGroupStore, StoreError, StoreResult};

static INIT: Once = Once::new();

/// Initialize logging for tests (once).
pub fn init_test_logging() {
    INIT.call_once(|| {
        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();
        }
    });
}

/// A snapshot stream over well-formed records.
pub fn snapshot(records: Vec<DirectoryGroupRecord>) -> impl Stream<Item = SnapshotItem> + Send {
    stream::iter(records.into_iter().map(Ok))
}

/// A snapshot stream over raw items.
pub fn snapshot_items(items: Vec<SnapshotItem>) -> impl Stream<Item = SnapshotItem> + Send {
    stream::iter(items)
}

/// A record with a display name.
pub fn record(directory_id: &str, account_name: &str, dn: &str) -> DirectoryGroupRecord {
    DirectoryGroupRecord::new(directory_id, account_name, dn).with_display_name(account_name)
}

/// A directory-managed group as a previous run would have left it.
pub fn managed_group(directory_id: &str, dn: &str) -> Group {
    let mut group = Group::for_directory(GroupId::new(), directory_id);
    group.code = directory_id.to_string();
    group.title = directory_id.to_string();
    group.distinguished_name = Some(dn.to_string());
    group.is_directory_managed = true;
    group
}

/// Which store call a [`FailingStore`] breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    SaveGroup,
    AttachMapping,
    DeleteGroup,
    StreamManaged,
}

/// Wraps an in-memory store and fails one kind of call after `succeed_first`
/// successful ones.
pub struct FailingStore {
    pub inner: Arc<InMemoryGroupStore>,
    fail_on: FailOn,
    succeed_first: usize,
    calls: AtomicUsize,
    pub failed: AtomicBool,
}

impl FailingStore {
    pub fn new(inner: Arc<InMemoryGroupStore>, fail_on: FailOn, succeed_first: usize) -> Self {
        Self {
            inner,
            fail_on,
            succeed_first,
            calls: AtomicUsize::new(0),
            failed: AtomicBool::new(false),
        }
    }

    fn check(&self, call: FailOn) -> StoreResult<()> {
        if call != self.fail_on {
            return Ok(());
        }
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n >= self.succeed_first {
            self.failed.store(true, Ordering::SeqCst);
            return Err(StoreError::backend(format!("injected {call:?} failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl GroupStore for FailingStore {
    async fn find_group_by_directory_id(&self, directory_id: &str) -> StoreResult<Option<Group>> {
        self.inner.find_group_by_directory_id(directory_id).await
    }

    async fn save_group(&self, group: &Group) -> StoreResult<()> {
        self.check(FailOn::SaveGroup)?;
        self.inner.save_group(group).await
    }

    async fn list_mappings(&self, group_id: GroupId) -> StoreResult<Vec<GroupMapping>> {
        self.inner.list_mappings(group_id).await
    }

    async fn attach_mapping(
        &self,
        group: &Group,
        mapping: GroupMapping,
    ) -> StoreResult<GroupMapping> {
        self.check(FailOn::AttachMapping)?;
        self.inner.attach_mapping(group, mapping).await
    }

    async fn delete_mapping(&self, mapping: &GroupMapping) -> StoreResult<()> {
        self.inner.delete_mapping(mapping).await
    }

    async fn delete_group(&self, group_id: GroupId) -> StoreResult<()> {
        self.check(FailOn::DeleteGroup)?;
        self.inner.delete_group(group_id).await
    }

    fn stream_directory_managed_groups(&self) -> BoxStream<'_, StoreResult<ManagedGroupRef>> {
        if self.check(FailOn::StreamManaged).is_err() {
            return Box::pin(stream::once(async {
                Err(StoreError::backend("injected stream failure"))
            }));
        }
        self.inner.stream_directory_managed_groups()
    }
}

/// A store that attaches mappings without persisting them, breaking the
/// one-mapping invariant.
pub struct LossyMappingStore {
    pub inner: Arc<InMemoryGroupStore>,
}

#[async_trait]
impl GroupStore for LossyMappingStore {
    async fn find_group_by_directory_id(&self, directory_id: &str) -> StoreResult<Option<Group>> {
        self.inner.find_group_by_directory_id(directory_id).await
    }

    async fn save_group(&self, group: &Group) -> StoreResult<()> {
        self.inner.save_group(group).await
    }

    async fn list_mappings(&self, group_id: GroupId) -> StoreResult<Vec<GroupMapping>> {
        self.inner.list_mappings(group_id).await
    }

    async fn attach_mapping(
        &self,
        group: &Group,
        mut mapping: GroupMapping,
    ) -> StoreResult<GroupMapping> {
        mapping.group_id = Some(group.id);
        Ok(mapping)
    }

    async fn delete_mapping(&self, mapping: &GroupMapping) -> StoreResult<()> {
        self.inner.delete_mapping(mapping).await
    }

    async fn delete_group(&self, group_id: GroupId) -> StoreResult<()> {
        self.inner.delete_group(group_id).await
    }

    fn stream_directory_managed_groups(&self) -> BoxStream<'_, StoreResult<ManagedGroupRef>> {
        self.inner.stream_directory_managed_groups()
    }
}

/// A store that raises a stop flag once a group has been deleted.
pub struct StopAfterDeleteStore {
    pub inner: Arc<InMemoryGroupStore>,
    pub stop: Arc<AtomicBool>,
}

#[async_trait]
impl GroupStore for StopAfterDeleteStore {
    async fn find_group_by_directory_id(&self, directory_id: &str) -> StoreResult<Option<Group>> {
        self.inner.find_group_by_directory_id(directory_id).await
    }

    async fn save_group(&self, group: &Group) -> StoreResult<()> {
        self.inner.save_group(group).await
    }

    async fn list_mappings(&self, group_id: GroupId) -> StoreResult<Vec<GroupMapping>> {
        self.inner.list_mappings(group_id).await
    }

    async fn attach_mapping(
        &self,
        group: &Group,
        mapping: GroupMapping,
    ) -> StoreResult<GroupMapping> {
        self.inner.attach_mapping(group, mapping).await
    }

    async fn delete_mapping(&self, mapping: &GroupMapping) -> StoreResult<()> {
        self.inner.delete_mapping(mapping).await
    }

    async fn delete_group(&self, group_id: GroupId) -> StoreResult<()> {
        self.inner.delete_group(group_id).await?;
        self.stop.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stream_directory_managed_groups(&self) -> BoxStream<'_, StoreResult<ManagedGroupRef>> {
        self.inner.stream_directory_managed_groups()
    }
}
