//! Tombstone Compactor
//!
//! Soft-deletes an item and closes the hole it leaves: every live sibling
//! ranked after it moves up by one. The tombstoned item keeps its last rank,
//! which is informational only and never checked against the live set.
//!
//! Permanent deletion of an already tombstoned item also lives here. It has
//! no rank side effects because the item is outside the live ordering.

use crate::{lock_owned_item, RankEngine};
use ranklist_core::{ItemId, OwnerId, Rank, RankError, RanklistResult};
use ranklist_storage::{RankStore, RankTransaction};
use tracing::Instrument;

impl<S: RankStore> RankEngine<S> {
    /// Tombstone a live item and compact the ranks behind it.
    ///
    /// Not idempotent: a second call for the same item fails with
    /// `ItemNotFound` and moves nothing.
    pub async fn soft_delete(&self, owner_id: OwnerId, item_id: ItemId) -> RanklistResult<()> {
        let span = tracing::info_span!("rank_soft_delete", %owner_id, %item_id);
        self.soft_delete_inner(owner_id, item_id)
            .instrument(span)
            .await
    }

    async fn soft_delete_inner(&self, owner_id: OwnerId, item_id: ItemId) -> RanklistResult<()> {
        let mut tx = self.store.begin().await?;
        let result = tombstone_in_tx(tx.as_mut(), owner_id, item_id).await;
        let frozen_rank = self.finish(tx, "soft_delete", result).await?;
        tracing::info!(frozen_rank, "item moved to trash");
        Ok(())
    }

    /// Remove a tombstoned item for good.
    pub async fn permanently_delete(&self, owner_id: OwnerId, item_id: ItemId) -> RanklistResult<()> {
        let span = tracing::info_span!("rank_permanent_delete", %owner_id, %item_id);
        self.permanently_delete_inner(owner_id, item_id)
            .instrument(span)
            .await
    }

    async fn permanently_delete_inner(&self, owner_id: OwnerId, item_id: ItemId) -> RanklistResult<()> {
        let mut tx = self.store.begin().await?;
        let result = purge_in_tx(tx.as_mut(), owner_id, item_id).await;
        self.finish(tx, "permanently_delete", result).await?;
        tracing::info!("item permanently deleted");
        Ok(())
    }
}

async fn tombstone_in_tx(
    tx: &mut dyn RankTransaction,
    owner_id: OwnerId,
    item_id: ItemId,
) -> RanklistResult<Rank> {
    let (container, item) = lock_owned_item(tx, owner_id, item_id).await?;
    if item.is_tombstoned() {
        return Err(RankError::ItemNotFound { item_id }.into());
    }

    tx.item_tombstone(item_id, chrono::Utc::now()).await?;
    // nothing ranks after Rank::MAX
    if let Some(from_rank) = item.rank.checked_add(1) {
        let moved = tx
            .shift_live_ranks(container.container_id, from_rank, -1)
            .await?;
        tracing::debug!(rank = item.rank, moved, "compacted siblings");
    }
    Ok(item.rank)
}

async fn purge_in_tx(
    tx: &mut dyn RankTransaction,
    owner_id: OwnerId,
    item_id: ItemId,
) -> RanklistResult<()> {
    let (_, item) = lock_owned_item(tx, owner_id, item_id).await?;
    if item.is_live() {
        return Err(RankError::ItemNotFound { item_id }.into());
    }
    tx.item_delete(item_id).await
}
