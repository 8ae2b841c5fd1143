//! PostgreSQL group store.
//!
//! Tables are created by the embedded migrations (see [`crate::migrations`]).
//! The managed-group scan streams `(id, directory_id)` rows straight from the
//! server, so deletions issued during the scan run on a second pool
//! connection. Pools need at least two connections.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::{BoxStream, StreamExt};
use sha2::{Digest, Sha256};
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres};
use uuid::Uuid;

use dirsync_core::{Group, GroupId, GroupMapping, ManagedGroupRef, MappingId};

use crate::error::{StoreError, StoreResult};
use crate::store::GroupStore;

/// A [`GroupStore`] backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgGroupStore {
    pool: PgPool,
}

/// Smallest pool that can serve a locked destructive run.
pub const MIN_POOL_CONNECTIONS: u32 = 3;

impl PgGroupStore {
    /// Wrap an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a new pool.
    ///
    /// A destructive run holds the run lock, the managed-group cursor and a
    /// write connection at the same time, so the pool never goes below
    /// [`MIN_POOL_CONNECTIONS`].
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let max_connections = max_connections.max(MIN_POOL_CONNECTIONS);
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
            .map_err(StoreError::ConnectionFailed)?;

        tracing::debug!(max_connections, "Connected group store pool");
        Ok(Self { pool })
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check the database answers.
    pub async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(StoreError::ConnectionFailed)?;
        Ok(())
    }

    /// Take the single-flight lock for `scope` (usually the directory URL).
    ///
    /// Returns [`StoreError::RunInProgress`] when another session holds it.
    /// The lock lives on a dedicated connection and is released by
    /// [`RunLock::release`] or when the guard is dropped.
    pub async fn try_acquire_run_lock(&self, scope: &str) -> StoreResult<RunLock> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(StoreError::ConnectionFailed)?;
        let key = run_lock_key(scope);

        let (acquired,): (bool,) = sqlx::query_as("SELECT pg_try_advisory_lock($1)")
            .bind(key)
            .fetch_one(&mut *conn)
            .await
            .map_err(StoreError::QueryFailed)?;

        if !acquired {
            return Err(StoreError::RunInProgress {
                scope: scope.to_string(),
            });
        }

        tracing::debug!(scope = %scope, key, "Acquired reconciliation run lock");
        Ok(RunLock {
            conn: Some(conn),
            key,
            scope: scope.to_string(),
        })
    }
}

/// Session-level advisory lock serializing reconciliation runs.
#[derive(Debug)]
pub struct RunLock {
    conn: Option<PoolConnection<Postgres>>,
    key: i64,
    scope: String,
}

impl RunLock {
    /// Scope this lock was taken for.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Release the lock and return the connection to the pool.
    pub async fn release(mut self) -> StoreResult<()> {
        if let Some(mut conn) = self.conn.take() {
            sqlx::query("SELECT pg_advisory_unlock($1)")
                .bind(self.key)
                .execute(&mut *conn)
                .await
                .map_err(StoreError::QueryFailed)?;
            tracing::debug!(scope = %self.scope, "Released reconciliation run lock");
        }
        Ok(())
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        // Closing the session releases any advisory lock it holds.
        if let Some(conn) = self.conn.take() {
            drop(conn.detach());
        }
    }
}

/// Stable advisory lock key for a scope string.
fn run_lock_key(scope: &str) -> i64 {
    let digest = Sha256::digest(scope.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(bytes)
}

#[derive(Debug, FromRow)]
struct GroupRow {
    id: Uuid,
    directory_id: Option<String>,
    code: String,
    title: String,
    description: Option<String>,
    distinguished_name: Option<String>,
    last_synced_at: Option<DateTime<Utc>>,
    is_directory_managed: bool,
}

impl From<GroupRow> for Group {
    fn from(row: GroupRow) -> Self {
        Self {
            id: GroupId::from_uuid(row.id),
            directory_id: row.directory_id,
            code: row.code,
            title: row.title,
            description: row.description,
            distinguished_name: row.distinguished_name,
            last_synced_at: row.last_synced_at,
            is_directory_managed: row.is_directory_managed,
        }
    }
}

#[derive(Debug, FromRow)]
struct MappingRow {
    id: Uuid,
    group_id: Uuid,
    distinguished_name: String,
}

impl From<MappingRow> for GroupMapping {
    fn from(row: MappingRow) -> Self {
        Self {
            id: MappingId::from_uuid(row.id),
            group_id: Some(GroupId::from_uuid(row.group_id)),
            distinguished_name: row.distinguished_name,
        }
    }
}

#[derive(Debug, FromRow)]
struct ManagedGroupRow {
    id: Uuid,
    directory_id: String,
}

impl From<ManagedGroupRow> for ManagedGroupRef {
    fn from(row: ManagedGroupRow) -> Self {
        Self {
            id: GroupId::from_uuid(row.id),
            directory_id: row.directory_id,
        }
    }
}

fn map_write_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StoreError::Conflict(db.message().to_string());
        }
    }
    StoreError::QueryFailed(e)
}

#[async_trait]
impl GroupStore for PgGroupStore {
    async fn find_group_by_directory_id(&self, directory_id: &str) -> StoreResult<Option<Group>> {
        let row: Option<GroupRow> = sqlx::query_as(
            r"
            SELECT id, directory_id, code, title, description, distinguished_name,
                   last_synced_at, is_directory_managed
            FROM groups
            WHERE directory_id = $1
            ORDER BY is_directory_managed DESC, created_at
            LIMIT 1
            ",
        )
        .bind(directory_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::QueryFailed)?;

        Ok(row.map(Group::from))
    }

    async fn save_group(&self, group: &Group) -> StoreResult<()> {
        sqlx::query(
            r"
            INSERT INTO groups
                (id, directory_id, code, title, description, distinguished_name,
                 last_synced_at, is_directory_managed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                directory_id = EXCLUDED.directory_id,
                code = EXCLUDED.code,
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                distinguished_name = EXCLUDED.distinguished_name,
                last_synced_at = EXCLUDED.last_synced_at,
                is_directory_managed = EXCLUDED.is_directory_managed,
                updated_at = NOW()
            ",
        )
        .bind(group.id.as_uuid())
        .bind(&group.directory_id)
        .bind(&group.code)
        .bind(&group.title)
        .bind(&group.description)
        .bind(&group.distinguished_name)
        .bind(group.last_synced_at)
        .bind(group.is_directory_managed)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(())
    }

    async fn list_mappings(&self, group_id: GroupId) -> StoreResult<Vec<GroupMapping>> {
        let rows: Vec<MappingRow> = sqlx::query_as(
            r"
            SELECT id, group_id, distinguished_name
            FROM group_mappings
            WHERE group_id = $1
            ORDER BY created_at, id
            ",
        )
        .bind(group_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::QueryFailed)?;

        Ok(rows.into_iter().map(GroupMapping::from).collect())
    }

    async fn attach_mapping(
        &self,
        group: &Group,
        mapping: GroupMapping,
    ) -> StoreResult<GroupMapping> {
        let row: MappingRow = sqlx::query_as(
            r"
            INSERT INTO group_mappings (id, group_id, distinguished_name)
            VALUES ($1, $2, $3)
            RETURNING id, group_id, distinguished_name
            ",
        )
        .bind(mapping.id.as_uuid())
        .bind(group.id.as_uuid())
        .bind(&mapping.distinguished_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                StoreError::not_found(format!("group {}", group.id))
            }
            other => map_write_error(other),
        })?;

        Ok(row.into())
    }

    async fn delete_mapping(&self, mapping: &GroupMapping) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM group_mappings WHERE id = $1")
            .bind(mapping.id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(StoreError::QueryFailed)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!("mapping {}", mapping.id)));
        }
        Ok(())
    }

    async fn delete_group(&self, group_id: GroupId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(group_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(StoreError::QueryFailed)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!("group {group_id}")));
        }
        Ok(())
    }

    fn stream_directory_managed_groups(&self) -> BoxStream<'_, StoreResult<ManagedGroupRef>> {
        sqlx::query_as::<_, ManagedGroupRow>(
            r"
            SELECT id, directory_id
            FROM groups
            WHERE is_directory_managed AND directory_id IS NOT NULL
            ORDER BY id
            ",
        )
        .fetch(&self.pool)
        .map(|row| {
            row.map(ManagedGroupRef::from)
                .map_err(StoreError::QueryFailed)
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_lock_key_is_stable() {
        assert_eq!(
            run_lock_key("ldap://dc1.example.com"),
            run_lock_key("ldap://dc1.example.com")
        );
        assert_ne!(
            run_lock_key("ldap://dc1.example.com"),
            run_lock_key("ldap://dc2.example.com")
        );
    }

    #[test]
    fn test_group_row_conversion() {
        let id = Uuid::new_v4();
        let group = Group::from(GroupRow {
            id,
            directory_id: Some("g1".to_string()),
            code: "eng".to_string(),
            title: "Engineering".to_string(),
            description: None,
            distinguished_name: Some("CN=Engineering".to_string()),
            last_synced_at: None,
            is_directory_managed: true,
        });
        assert_eq!(group.id.as_uuid(), &id);
        assert_eq!(group.managed_ref().unwrap().directory_id, "g1");
    }
}
