//! [`RankStore`] over a deadpool-postgres pool.
//!
//! Each transaction pins one pooled connection between `BEGIN` and
//! `COMMIT`/`ROLLBACK`. `container_lock` takes `SELECT ... FOR UPDATE` on the
//! container row, which serializes every mutation of that container.

use crate::error::{pool_error, query_error, row_error};
use crate::schema::{self, SCHEMA};
use crate::DbConfig;
use async_trait::async_trait;
use deadpool_postgres::{Object, Pool};
use ranklist_core::{
    Container, ContainerId, EntityIdType, Item, ItemAttributes, ItemId, OwnerId, Rank,
    RankAssignment, RanklistResult, StorageError, Timestamp,
};
use ranklist_storage::{RankStore, RankTransaction};
use tokio_postgres::Row;
use uuid::Uuid;

// ============================================================================
// STORE
// ============================================================================

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgRankStore {
    pool: Pool,
}

impl PgRankStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a store from configuration.
    pub fn from_config(config: &DbConfig) -> RanklistResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    /// Create tables and indexes if they do not exist.
    pub async fn migrate(&self) -> RanklistResult<()> {
        let conn = self.pool.get().await.map_err(pool_error)?;
        conn.batch_execute(SCHEMA)
            .await
            .map_err(query_error("migrate"))?;
        tracing::info!("ranklist schema ready");
        Ok(())
    }
}

impl std::fmt::Debug for PgRankStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgRankStore")
            .field("pool_size", &self.pool_size())
            .finish()
    }
}

#[async_trait]
impl RankStore for PgRankStore {
    async fn begin(&self) -> RanklistResult<Box<dyn RankTransaction>> {
        let conn = self.pool.get().await.map_err(pool_error)?;
        conn.batch_execute("BEGIN ISOLATION LEVEL READ COMMITTED")
            .await
            .map_err(query_error("begin"))?;
        Ok(Box::new(PgTransaction { conn: Some(conn) }))
    }
}

// ============================================================================
// TRANSACTION
// ============================================================================

/// An open transaction pinned to one pooled connection.
///
/// Dropped without `commit` or `rollback`, the connection is detached from
/// the pool and closed, and the server rolls the transaction back.
pub struct PgTransaction {
    conn: Option<Object>,
}

impl PgTransaction {
    fn conn(&self) -> RanklistResult<&Object> {
        self.conn.as_ref().ok_or_else(|| {
            StorageError::TransactionFailed {
                reason: "transaction already finished".to_string(),
            }
            .into()
        })
    }

    /// Run a statement that must touch exactly one row.
    async fn execute_one(
        &self,
        operation: &'static str,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> RanklistResult<()> {
        let affected = self
            .conn()?
            .execute(sql, params)
            .await
            .map_err(query_error(operation))?;
        if affected != 1 {
            return Err(StorageError::QueryFailed {
                operation: operation.to_string(),
                reason: format!("expected one row, touched {}", affected),
            }
            .into());
        }
        Ok(())
    }

    /// End the transaction with `statement`. A connection whose `COMMIT` or
    /// `ROLLBACK` failed is not returned to the pool.
    async fn finish(&mut self, statement: &'static str) -> RanklistResult<()> {
        let conn = self.conn.take().ok_or_else(|| StorageError::TransactionFailed {
            reason: "transaction already finished".to_string(),
        })?;
        match conn.batch_execute(statement).await {
            Ok(()) => Ok(()),
            Err(err) => {
                let _ = Object::take(conn);
                Err(query_error(if statement == "COMMIT" { "commit" } else { "rollback" })(err))
            }
        }
    }
}

impl Drop for PgTransaction {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::warn!("transaction dropped while open, discarding connection");
            let _ = Object::take(conn);
        }
    }
}

#[async_trait]
impl RankTransaction for PgTransaction {
    // === Container Operations ===

    async fn container_insert(&mut self, container: &Container) -> RanklistResult<()> {
        self.execute_one(
            "container_insert",
            schema::CONTAINER_INSERT,
            &[
                &container.container_id.as_uuid(),
                &container.owner_id.as_uuid(),
                &container.name,
                &container.is_private,
                &container.max_items,
                &container.created_at,
                &container.updated_at,
            ],
        )
        .await
    }

    async fn container_get(&mut self, id: ContainerId) -> RanklistResult<Option<Container>> {
        let row = self
            .conn()?
            .query_opt(schema::CONTAINER_GET, &[&id.as_uuid()])
            .await
            .map_err(query_error("container_get"))?;
        row.as_ref().map(container_from_row).transpose()
    }

    async fn container_lock(&mut self, id: ContainerId) -> RanklistResult<Option<Container>> {
        let row = self
            .conn()?
            .query_opt(schema::CONTAINER_LOCK, &[&id.as_uuid()])
            .await
            .map_err(query_error("container_lock"))?;
        row.as_ref().map(container_from_row).transpose()
    }

    async fn container_set_max_items(&mut self, id: ContainerId, max_items: i32) -> RanklistResult<()> {
        self.execute_one(
            "container_set_max_items",
            schema::CONTAINER_SET_MAX_ITEMS,
            &[&id.as_uuid(), &max_items],
        )
        .await
    }

    async fn container_delete(&mut self, id: ContainerId) -> RanklistResult<u64> {
        let conn = self.conn()?;
        let removed = conn
            .execute(schema::CONTAINER_DELETE_ITEMS, &[&id.as_uuid()])
            .await
            .map_err(query_error("container_delete"))?;
        conn.execute(schema::CONTAINER_DELETE, &[&id.as_uuid()])
            .await
            .map_err(query_error("container_delete"))?;
        Ok(removed)
    }

    // === Item Reads ===

    async fn item_get(&mut self, id: ItemId) -> RanklistResult<Option<Item>> {
        let row = self
            .conn()?
            .query_opt(schema::ITEM_GET, &[&id.as_uuid()])
            .await
            .map_err(query_error("item_get"))?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn live_items(&mut self, container_id: ContainerId) -> RanklistResult<Vec<Item>> {
        let rows = self
            .conn()?
            .query(schema::ITEM_LIVE, &[&container_id.as_uuid()])
            .await
            .map_err(query_error("live_items"))?;
        rows.iter().map(item_from_row).collect()
    }

    async fn live_count(&mut self, container_id: ContainerId) -> RanklistResult<i64> {
        let row = self
            .conn()?
            .query_one(schema::ITEM_LIVE_COUNT, &[&container_id.as_uuid()])
            .await
            .map_err(query_error("live_count"))?;
        row.try_get(0).map_err(row_error("live_count"))
    }

    async fn max_live_rank(&mut self, container_id: ContainerId) -> RanklistResult<Option<Rank>> {
        let row = self
            .conn()?
            .query_one(schema::ITEM_MAX_LIVE_RANK, &[&container_id.as_uuid()])
            .await
            .map_err(query_error("max_live_rank"))?;
        row.try_get(0).map_err(row_error("max_live_rank"))
    }

    async fn tombstoned_for_owner(&mut self, owner_id: OwnerId, limit: i64) -> RanklistResult<Vec<Item>> {
        let rows = self
            .conn()?
            .query(schema::ITEM_TOMBSTONED_FOR_OWNER, &[&owner_id.as_uuid(), &limit])
            .await
            .map_err(query_error("tombstoned_for_owner"))?;
        rows.iter().map(item_from_row).collect()
    }

    // === Item Writes ===

    async fn shift_live_ranks(
        &mut self,
        container_id: ContainerId,
        from_rank: Rank,
        delta: Rank,
    ) -> RanklistResult<u64> {
        self.conn()?
            .execute(
                schema::ITEM_SHIFT_LIVE,
                &[&container_id.as_uuid(), &from_rank, &delta],
            )
            .await
            .map_err(query_error("shift_live_ranks"))
    }

    async fn item_insert(&mut self, item: &Item) -> RanklistResult<()> {
        let a = &item.attributes;
        self.execute_one(
            "item_insert",
            schema::ITEM_INSERT,
            &[
                &item.item_id.as_uuid(),
                &item.container_id.as_uuid(),
                &item.rank,
                &item.tombstoned_at,
                &a.title,
                &a.description,
                &a.image_url,
                &a.external_id,
                &a.external_type,
                &a.notes,
                &a.is_private,
                &item.created_at,
                &item.updated_at,
            ],
        )
        .await
    }

    async fn item_update_attributes(&mut self, id: ItemId, attributes: &ItemAttributes) -> RanklistResult<()> {
        self.execute_one(
            "item_update_attributes",
            schema::ITEM_UPDATE_ATTRIBUTES,
            &[
                &id.as_uuid(),
                &attributes.title,
                &attributes.description,
                &attributes.image_url,
                &attributes.external_id,
                &attributes.external_type,
                &attributes.notes,
                &attributes.is_private,
            ],
        )
        .await
    }

    async fn item_set_ranks(&mut self, assignments: &[RankAssignment]) -> RanklistResult<()> {
        for assignment in assignments {
            self.execute_one(
                "item_set_ranks",
                schema::ITEM_SET_RANK,
                &[&assignment.item_id.as_uuid(), &assignment.rank],
            )
            .await?;
        }
        Ok(())
    }

    async fn item_tombstone(&mut self, id: ItemId, at: Timestamp) -> RanklistResult<()> {
        self.execute_one("item_tombstone", schema::ITEM_TOMBSTONE, &[&id.as_uuid(), &at])
            .await
    }

    async fn item_restore(&mut self, id: ItemId, rank: Rank) -> RanklistResult<()> {
        self.execute_one("item_restore", schema::ITEM_RESTORE, &[&id.as_uuid(), &rank])
            .await
    }

    async fn item_delete(&mut self, id: ItemId) -> RanklistResult<()> {
        self.execute_one("item_delete", schema::ITEM_DELETE, &[&id.as_uuid()])
            .await
    }

    // === Transaction Control ===

    async fn commit(&mut self) -> RanklistResult<()> {
        self.finish("COMMIT").await
    }

    async fn rollback(&mut self) -> RanklistResult<()> {
        self.finish("ROLLBACK").await
    }
}

// ============================================================================
// ROW CONVERSION
// ============================================================================

fn container_from_row(row: &Row) -> RanklistResult<Container> {
    let decode = row_error("container");
    Ok(Container {
        container_id: ContainerId::new(row.try_get::<_, Uuid>("container_id").map_err(&decode)?),
        owner_id: OwnerId::new(row.try_get::<_, Uuid>("owner_id").map_err(&decode)?),
        name: row.try_get("name").map_err(&decode)?,
        is_private: row.try_get("is_private").map_err(&decode)?,
        max_items: row.try_get("max_items").map_err(&decode)?,
        created_at: row.try_get("created_at").map_err(&decode)?,
        updated_at: row.try_get("updated_at").map_err(&decode)?,
    })
}

fn item_from_row(row: &Row) -> RanklistResult<Item> {
    let decode = row_error("item");
    Ok(Item {
        item_id: ItemId::new(row.try_get::<_, Uuid>("item_id").map_err(&decode)?),
        container_id: ContainerId::new(row.try_get::<_, Uuid>("container_id").map_err(&decode)?),
        rank: row.try_get("rank").map_err(&decode)?,
        tombstoned_at: row.try_get("tombstoned_at").map_err(&decode)?,
        attributes: ItemAttributes {
            title: row.try_get("title").map_err(&decode)?,
            description: row.try_get("description").map_err(&decode)?,
            image_url: row.try_get("image_url").map_err(&decode)?,
            external_id: row.try_get("external_id").map_err(&decode)?,
            external_type: row.try_get("external_type").map_err(&decode)?,
            notes: row.try_get("notes").map_err(&decode)?,
            is_private: row.try_get("is_private").map_err(&decode)?,
        },
        created_at: row.try_get("created_at").map_err(&decode)?,
        updated_at: row.try_get("updated_at").map_err(&decode)?,
    })
}
