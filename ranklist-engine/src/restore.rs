//! Restore Reintegrator
//!
//! Brings a tombstoned item back at the tail of its container. The old rank
//! is never reused: intervening inserts and deletes have renumbered the
//! container since, so only an append is guaranteed collision free.

use crate::sequencer::tail_rank;
use crate::{lock_owned_item, CapacityGuard, RankEngine};
use ranklist_core::{ItemId, OwnerId, Rank, RankError, RanklistResult};
use ranklist_storage::{RankStore, RankTransaction};
use tracing::Instrument;

impl<S: RankStore> RankEngine<S> {
    /// Clear an item's tombstone and append it. Returns the new rank.
    ///
    /// Fails with `CapacityExceeded` when the container is full; the item
    /// then stays tombstoned.
    pub async fn restore(&self, owner_id: OwnerId, item_id: ItemId) -> RanklistResult<Rank> {
        let span = tracing::info_span!("rank_restore", %owner_id, %item_id);
        self.restore_inner(owner_id, item_id).instrument(span).await
    }

    async fn restore_inner(&self, owner_id: OwnerId, item_id: ItemId) -> RanklistResult<Rank> {
        let mut tx = self.store.begin().await?;
        let result = restore_in_tx(tx.as_mut(), owner_id, item_id).await;
        let rank = self.finish(tx, "restore", result).await?;
        tracing::info!(rank, "item restored");
        Ok(rank)
    }
}

async fn restore_in_tx(
    tx: &mut dyn RankTransaction,
    owner_id: OwnerId,
    item_id: ItemId,
) -> RanklistResult<Rank> {
    let (container, item) = lock_owned_item(tx, owner_id, item_id).await?;
    if item.is_live() {
        return Err(RankError::ItemNotFound { item_id }.into());
    }

    CapacityGuard::load(tx, &container).await?.admit(1)?;

    let rank = tail_rank(tx, container.container_id).await?;
    tx.item_restore(item_id, rank).await?;
    Ok(rank)
}
