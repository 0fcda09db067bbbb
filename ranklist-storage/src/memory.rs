//! In-memory transactional store.
//!
//! A single async mutex serializes transactions. Each transaction mutates a
//! private copy of the state that replaces the shared state on commit, so a
//! rolled back or dropped transaction leaves nothing behind.

use crate::{RankStore, RankTransaction};
use async_trait::async_trait;
use ranklist_core::{
    Container, ContainerId, Item, ItemAttributes, ItemId, OwnerId, Rank, RankAssignment,
    RanklistResult, StorageError, Timestamp,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    containers: HashMap<ContainerId, Container>,
    items: HashMap<ItemId, Item>,
}

#[derive(Debug, Default)]
struct FaultPlan {
    fail_next_commit: AtomicBool,
    /// Writes the next transaction may perform before failing; negative means unlimited.
    write_budget: AtomicI64,
}

/// Commit and rollback counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStatistics {
    pub commits: u64,
    pub rollbacks: u64,
}

#[derive(Debug, Default)]
struct Counters {
    commits: AtomicU64,
    rollbacks: AtomicU64,
}

/// In-memory store for tests and embedding.
#[derive(Debug, Clone)]
pub struct MemoryRankStore {
    state: Arc<Mutex<MemoryState>>,
    faults: Arc<FaultPlan>,
    counters: Arc<Counters>,
}

impl Default for MemoryRankStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRankStore {
    pub fn new() -> Self {
        let faults = FaultPlan::default();
        faults.write_budget.store(-1, Ordering::SeqCst);
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            faults: Arc::new(faults),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Make the next commit fail with `TransactionFailed`.
    pub fn fail_next_commit(&self) {
        self.faults.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Let the next transaction perform `writes` writes, then fail the one after.
    pub fn fail_after_writes(&self, writes: u32) {
        self.faults
            .write_budget
            .store(i64::from(writes), Ordering::SeqCst);
    }

    pub fn statistics(&self) -> StoreStatistics {
        StoreStatistics {
            commits: self.counters.commits.load(Ordering::SeqCst),
            rollbacks: self.counters.rollbacks.load(Ordering::SeqCst),
        }
    }

    /// Committed container by ID.
    pub async fn container(&self, id: ContainerId) -> Option<Container> {
        self.state.lock().await.containers.get(&id).cloned()
    }

    /// Committed item by ID.
    pub async fn item(&self, id: ItemId) -> Option<Item> {
        self.state.lock().await.items.get(&id).cloned()
    }

    /// Every committed item of a container, live and tombstoned, by rank.
    pub async fn items_in(&self, container_id: ContainerId) -> Vec<Item> {
        let state = self.state.lock().await;
        let mut items: Vec<Item> = state
            .items
            .values()
            .filter(|i| i.container_id == container_id)
            .cloned()
            .collect();
        sort_by_rank(&mut items);
        items
    }

    /// Write a raw item row, bypassing every engine rule.
    pub async fn put_item_unchecked(&self, item: Item) {
        self.state.lock().await.items.insert(item.item_id, item);
    }
}

#[async_trait]
impl RankStore for MemoryRankStore {
    async fn begin(&self) -> RanklistResult<Box<dyn RankTransaction>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        let budget = self.faults.write_budget.swap(-1, Ordering::SeqCst);
        Ok(Box::new(MemoryTransaction {
            guard: Some(guard),
            working,
            write_budget: u64::try_from(budget).ok(),
            faults: Arc::clone(&self.faults),
            counters: Arc::clone(&self.counters),
        }))
    }
}

/// Transaction over a [`MemoryRankStore`].
pub struct MemoryTransaction {
    guard: Option<OwnedMutexGuard<MemoryState>>,
    working: MemoryState,
    write_budget: Option<u64>,
    faults: Arc<FaultPlan>,
    counters: Arc<Counters>,
}

impl MemoryTransaction {
    fn ensure_open(&self) -> RanklistResult<()> {
        if self.guard.is_none() {
            return Err(StorageError::TransactionFailed {
                reason: "transaction already finished".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn charge_write(&mut self) -> RanklistResult<()> {
        self.ensure_open()?;
        match self.write_budget {
            Some(0) => Err(StorageError::TransactionFailed {
                reason: "injected write failure".to_string(),
            }
            .into()),
            Some(ref mut left) => {
                *left -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn item_mut(&mut self, id: ItemId, operation: &str) -> RanklistResult<&mut Item> {
        self.working.items.get_mut(&id).ok_or_else(|| {
            StorageError::QueryFailed {
                operation: operation.to_string(),
                reason: format!("item {} does not exist", id),
            }
            .into()
        })
    }

    fn live_in(&self, container_id: ContainerId) -> impl Iterator<Item = &Item> {
        self.working
            .items
            .values()
            .filter(move |i| i.container_id == container_id && i.is_live())
    }
}

fn sort_by_rank(items: &mut [Item]) {
    items.sort_by(|a, b| {
        a.rank
            .cmp(&b.rank)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.item_id.cmp(&b.item_id))
    });
}

#[async_trait]
impl RankTransaction for MemoryTransaction {
    async fn container_insert(&mut self, container: &Container) -> RanklistResult<()> {
        self.charge_write()?;
        if self.working.containers.contains_key(&container.container_id) {
            return Err(StorageError::QueryFailed {
                operation: "container_insert".to_string(),
                reason: "already exists".to_string(),
            }
            .into());
        }
        self.working
            .containers
            .insert(container.container_id, container.clone());
        Ok(())
    }

    async fn container_get(&mut self, id: ContainerId) -> RanklistResult<Option<Container>> {
        self.ensure_open()?;
        Ok(self.working.containers.get(&id).cloned())
    }

    // the store mutex already serializes transactions
    async fn container_lock(&mut self, id: ContainerId) -> RanklistResult<Option<Container>> {
        self.container_get(id).await
    }

    async fn container_set_max_items(&mut self, id: ContainerId, max_items: i32) -> RanklistResult<()> {
        self.charge_write()?;
        let container = self.working.containers.get_mut(&id).ok_or_else(|| {
            StorageError::QueryFailed {
                operation: "container_set_max_items".to_string(),
                reason: format!("container {} does not exist", id),
            }
        })?;
        container.max_items = max_items;
        container.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn container_delete(&mut self, id: ContainerId) -> RanklistResult<u64> {
        self.charge_write()?;
        self.working.containers.remove(&id);
        let before = self.working.items.len();
        self.working.items.retain(|_, item| item.container_id != id);
        Ok((before - self.working.items.len()) as u64)
    }

    async fn item_get(&mut self, id: ItemId) -> RanklistResult<Option<Item>> {
        self.ensure_open()?;
        Ok(self.working.items.get(&id).cloned())
    }

    async fn live_items(&mut self, container_id: ContainerId) -> RanklistResult<Vec<Item>> {
        self.ensure_open()?;
        let mut items: Vec<Item> = self.live_in(container_id).cloned().collect();
        sort_by_rank(&mut items);
        Ok(items)
    }

    async fn live_count(&mut self, container_id: ContainerId) -> RanklistResult<i64> {
        self.ensure_open()?;
        Ok(self.live_in(container_id).count() as i64)
    }

    async fn max_live_rank(&mut self, container_id: ContainerId) -> RanklistResult<Option<Rank>> {
        self.ensure_open()?;
        Ok(self.live_in(container_id).map(|i| i.rank).max())
    }

    async fn tombstoned_for_owner(&mut self, owner_id: OwnerId, limit: i64) -> RanklistResult<Vec<Item>> {
        self.ensure_open()?;
        let containers = &self.working.containers;
        let mut items: Vec<Item> = self
            .working
            .items
            .values()
            .filter(|i| i.is_tombstoned())
            .filter(|i| {
                containers
                    .get(&i.container_id)
                    .is_some_and(|c| c.owner_id == owner_id)
            })
            .cloned()
            .collect();
        items.sort_by(|a, b| b.tombstoned_at.cmp(&a.tombstoned_at));
        items.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(items)
    }

    async fn shift_live_ranks(
        &mut self,
        container_id: ContainerId,
        from_rank: Rank,
        delta: Rank,
    ) -> RanklistResult<u64> {
        self.charge_write()?;
        // INTEGER overflow aborts the whole statement on Postgres; nothing moves here either.
        let mut shifted = Vec::new();
        for item in self.live_in(container_id).filter(|i| i.rank >= from_rank) {
            let rank = item.rank.checked_add(delta).ok_or_else(|| StorageError::QueryFailed {
                operation: "shift_live_ranks".to_string(),
                reason: format!("rank {} shifted by {} is out of range", item.rank, delta),
            })?;
            shifted.push((item.item_id, rank));
        }

        let now = chrono::Utc::now();
        for (id, rank) in &shifted {
            let item = self.item_mut(*id, "shift_live_ranks")?;
            item.rank = *rank;
            item.updated_at = now;
        }
        Ok(shifted.len() as u64)
    }

    async fn item_insert(&mut self, item: &Item) -> RanklistResult<()> {
        self.charge_write()?;
        if self.working.items.contains_key(&item.item_id) {
            return Err(StorageError::QueryFailed {
                operation: "item_insert".to_string(),
                reason: "already exists".to_string(),
            }
            .into());
        }
        self.working.items.insert(item.item_id, item.clone());
        Ok(())
    }

    async fn item_update_attributes(&mut self, id: ItemId, attributes: &ItemAttributes) -> RanklistResult<()> {
        self.charge_write()?;
        let item = self.item_mut(id, "item_update_attributes")?;
        item.attributes = attributes.clone();
        item.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn item_set_ranks(&mut self, assignments: &[RankAssignment]) -> RanklistResult<()> {
        let now = chrono::Utc::now();
        for assignment in assignments {
            self.charge_write()?;
            let item = self.item_mut(assignment.item_id, "item_set_ranks")?;
            item.rank = assignment.rank;
            item.updated_at = now;
        }
        Ok(())
    }

    async fn item_tombstone(&mut self, id: ItemId, at: Timestamp) -> RanklistResult<()> {
        self.charge_write()?;
        let item = self.item_mut(id, "item_tombstone")?;
        item.tombstoned_at = Some(at);
        item.updated_at = at;
        Ok(())
    }

    async fn item_restore(&mut self, id: ItemId, rank: Rank) -> RanklistResult<()> {
        self.charge_write()?;
        let item = self.item_mut(id, "item_restore")?;
        item.tombstoned_at = None;
        item.rank = rank;
        item.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn item_delete(&mut self, id: ItemId) -> RanklistResult<()> {
        self.charge_write()?;
        self.working.items.remove(&id);
        Ok(())
    }

    async fn commit(&mut self) -> RanklistResult<()> {
        let Some(mut guard) = self.guard.take() else {
            return Err(StorageError::TransactionFailed {
                reason: "transaction already finished".to_string(),
            }
            .into());
        };

        if self.faults.fail_next_commit.swap(false, Ordering::SeqCst) {
            self.counters.rollbacks.fetch_add(1, Ordering::SeqCst);
            tracing::debug!("injected commit failure");
            return Err(StorageError::TransactionFailed {
                reason: "injected commit failure".to_string(),
            }
            .into());
        }

        *guard = std::mem::take(&mut self.working);
        self.counters.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&mut self) -> RanklistResult<()> {
        if self.guard.take().is_some() {
            self.counters.rollbacks.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
