//! Rank Sequencer
//!
//! Assigns the rank of a new item. Without a requested rank the item goes to
//! the tail; with one, every live sibling at or after that rank moves down by
//! one inside the same transaction before the item is written.

use crate::{lock_owned_container, CapacityGuard, RankEngine};
use ranklist_core::{
    clamp_requested_rank, ContainerId, InsertOutcome, Item, ItemAttributes, OwnerId, Rank,
    RankError, RanklistResult, ValidationError,
};
use ranklist_storage::{RankStore, RankTransaction};
use tracing::Instrument;

impl<S: RankStore> RankEngine<S> {
    /// Insert a new item into a container the caller owns.
    ///
    /// A requested rank past the tail is clamped to `N + 1`; the returned
    /// outcome carries the rank actually assigned.
    pub async fn insert(
        &self,
        owner_id: OwnerId,
        container_id: ContainerId,
        attributes: ItemAttributes,
        requested_rank: Option<Rank>,
    ) -> RanklistResult<InsertOutcome> {
        let span = tracing::info_span!(
            "rank_insert",
            %owner_id,
            %container_id,
            requested_rank = ?requested_rank,
        );

        self.insert_inner(owner_id, container_id, attributes, requested_rank)
            .instrument(span)
            .await
    }

    async fn insert_inner(
        &self,
        owner_id: OwnerId,
        container_id: ContainerId,
        attributes: ItemAttributes,
        requested_rank: Option<Rank>,
    ) -> RanklistResult<InsertOutcome> {
        attributes.validate()?;
        if let Some(rank) = requested_rank.filter(|r| *r < 1) {
            return Err(ValidationError::InvalidRank { rank }.into());
        }

        let mut tx = self.store.begin().await?;
        let result =
            insert_in_tx(tx.as_mut(), owner_id, container_id, attributes, requested_rank).await;
        let outcome = self.finish(tx, "insert", result).await?;
        tracing::info!(item_id = %outcome.item_id, rank = outcome.rank, "item inserted");
        Ok(outcome)
    }
}

async fn insert_in_tx(
    tx: &mut dyn RankTransaction,
    owner_id: OwnerId,
    container_id: ContainerId,
    attributes: ItemAttributes,
    requested_rank: Option<Rank>,
) -> RanklistResult<InsertOutcome> {
    let container = lock_owned_container(tx, owner_id, container_id).await?;
    let guard = CapacityGuard::load(tx, &container).await?;
    guard.admit(1)?;

    let rank = match requested_rank {
        None => tail_rank(tx, container_id).await?,
        Some(requested) => {
            let rank = clamp_requested_rank(requested, guard.live_count())?;
            if i64::from(rank) <= guard.live_count() {
                let moved = tx.shift_live_ranks(container_id, rank, 1).await?;
                tracing::debug!(rank, moved, "shifted siblings to open slot");
            }
            rank
        }
    };

    let item = Item::new(container_id, rank, attributes);
    tx.item_insert(&item).await?;
    Ok(InsertOutcome {
        item_id: item.item_id,
        rank,
    })
}

/// `max(live ranks) + 1`, or 1 for an empty container.
pub(crate) async fn tail_rank(
    tx: &mut dyn RankTransaction,
    container_id: ContainerId,
) -> RanklistResult<Rank> {
    match tx.max_live_rank(container_id).await? {
        None => Ok(1),
        Some(max) => max.checked_add(1).ok_or_else(|| {
            RankError::InvalidOrdering {
                container_id: Some(container_id),
                reason: format!("no rank follows live rank {}", max),
            }
            .into()
        }),
    }
}
