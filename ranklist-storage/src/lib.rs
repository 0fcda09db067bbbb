//! Ranklist Storage - Store Traits and In-Memory Implementation
//!
//! Defines the transactional boundary the position engine talks to. The
//! PostgreSQL implementation lives in ranklist-pg.

pub mod memory;

pub use memory::{MemoryRankStore, MemoryTransaction, StoreStatistics};

use async_trait::async_trait;
use ranklist_core::{
    Container, ContainerId, Item, ItemAttributes, ItemId, OwnerId, Rank, RankAssignment,
    RanklistResult, Timestamp,
};

// ============================================================================
// STORE TRAITS
// ============================================================================

/// A persistent store able to open transactions.
#[async_trait]
pub trait RankStore: Send + Sync {
    /// Open a new transaction. Nothing it writes is visible to other
    /// transactions until [`RankTransaction::commit`] succeeds.
    async fn begin(&self) -> RanklistResult<Box<dyn RankTransaction>>;
}

/// One open transaction against a [`RankStore`].
///
/// Dropping a transaction without committing discards its writes.
#[async_trait]
pub trait RankTransaction: Send {
    // === Container Operations ===

    /// Insert a new container.
    async fn container_insert(&mut self, container: &Container) -> RanklistResult<()>;

    /// Fetch a container without locking it.
    async fn container_get(&mut self, id: ContainerId) -> RanklistResult<Option<Container>>;

    /// Fetch a container and hold it against concurrent mutation until the
    /// transaction finishes.
    async fn container_lock(&mut self, id: ContainerId) -> RanklistResult<Option<Container>>;

    /// Overwrite the capacity bound.
    async fn container_set_max_items(&mut self, id: ContainerId, max_items: i32) -> RanklistResult<()>;

    /// Remove a container and every item in it. Returns the removed item count.
    async fn container_delete(&mut self, id: ContainerId) -> RanklistResult<u64>;

    // === Item Reads ===

    /// Get an item by ID, live or tombstoned.
    async fn item_get(&mut self, id: ItemId) -> RanklistResult<Option<Item>>;

    /// Live items of a container ordered by rank ascending.
    async fn live_items(&mut self, container_id: ContainerId) -> RanklistResult<Vec<Item>>;

    /// Number of live items in a container.
    async fn live_count(&mut self, container_id: ContainerId) -> RanklistResult<i64>;

    /// Highest live rank, `None` for an empty container.
    async fn max_live_rank(&mut self, container_id: ContainerId) -> RanklistResult<Option<Rank>>;

    /// Tombstoned items across every container owned by `owner_id`, newest
    /// tombstone first.
    async fn tombstoned_for_owner(&mut self, owner_id: OwnerId, limit: i64) -> RanklistResult<Vec<Item>>;

    // === Item Writes ===

    /// Add `delta` to the rank of every live item with `rank >= from_rank`.
    /// Returns the number of items moved.
    async fn shift_live_ranks(
        &mut self,
        container_id: ContainerId,
        from_rank: Rank,
        delta: Rank,
    ) -> RanklistResult<u64>;

    /// Insert a new item row.
    async fn item_insert(&mut self, item: &Item) -> RanklistResult<()>;

    /// Overwrite the descriptive attributes of an item. Rank and tombstone
    /// are untouched.
    async fn item_update_attributes(&mut self, id: ItemId, attributes: &ItemAttributes) -> RanklistResult<()>;

    /// Overwrite ranks for a batch of items.
    async fn item_set_ranks(&mut self, assignments: &[RankAssignment]) -> RanklistResult<()>;

    /// Mark an item deleted, leaving its rank untouched.
    async fn item_tombstone(&mut self, id: ItemId, at: Timestamp) -> RanklistResult<()>;

    /// Clear the tombstone and assign a fresh rank.
    async fn item_restore(&mut self, id: ItemId, rank: Rank) -> RanklistResult<()>;

    /// Remove an item row.
    async fn item_delete(&mut self, id: ItemId) -> RanklistResult<()>;

    // === Transaction Control ===

    /// Make every write of this transaction visible atomically.
    async fn commit(&mut self) -> RanklistResult<()>;

    /// Discard every write of this transaction.
    async fn rollback(&mut self) -> RanklistResult<()>;
}
