//! Bulk Reorder Transactor
//!
//! Applies a caller-supplied batch of `(item, rank)` pairs, typically the
//! result of a drag-and-drop reorder. All or nothing: one unauthorized item
//! fails the whole batch before any rank is written.
//!
//! Under [`ReorderPolicy::Strict`] the batch must also leave every affected
//! container dense. [`ReorderPolicy::Permissive`] trusts the caller's
//! permutation and only enforces authorization and atomicity.

use crate::RankEngine;
use ranklist_core::{
    ensure_dense, ContainerId, Item, ItemId, OwnerId, Rank, RankAssignment, RankError,
    RanklistResult, ReorderPolicy,
};
use ranklist_storage::{RankStore, RankTransaction};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::Instrument;

impl<S: RankStore> RankEngine<S> {
    /// Overwrite the ranks of a batch of items atomically.
    pub async fn bulk_reorder(
        &self,
        owner_id: OwnerId,
        assignments: Vec<RankAssignment>,
    ) -> RanklistResult<()> {
        let span = tracing::info_span!(
            "rank_bulk_reorder",
            %owner_id,
            batch = assignments.len(),
            policy = ?self.config.reorder_policy,
        );
        self.bulk_reorder_inner(owner_id, assignments)
            .instrument(span)
            .await
    }

    async fn bulk_reorder_inner(
        &self,
        owner_id: OwnerId,
        assignments: Vec<RankAssignment>,
    ) -> RanklistResult<()> {
        if assignments.is_empty() {
            return Ok(());
        }

        let mut tx = self.store.begin().await?;
        let result = reorder_in_tx(
            tx.as_mut(),
            owner_id,
            &assignments,
            self.config.reorder_policy,
        )
        .await;
        let containers = self.finish(tx, "bulk_reorder", result).await?;
        tracing::info!(containers, "batch reordered");
        Ok(())
    }
}

async fn reorder_in_tx(
    tx: &mut dyn RankTransaction,
    owner_id: OwnerId,
    assignments: &[RankAssignment],
    policy: ReorderPolicy,
) -> RanklistResult<usize> {
    let unauthorized = |item_id: ItemId| RankError::Unauthorized { owner_id, item_id };

    // container -> first item in the batch that references it
    let mut touched: BTreeMap<ContainerId, ItemId> = BTreeMap::new();
    for assignment in assignments {
        let item = tx
            .item_get(assignment.item_id)
            .await?
            .ok_or_else(|| unauthorized(assignment.item_id))?;
        touched.entry(item.container_id).or_insert(assignment.item_id);
    }

    // BTreeMap order gives every batch the same lock order
    for (&container_id, &first_item) in &touched {
        match tx.container_lock(container_id).await? {
            Some(container) if container.is_owned_by(owner_id) => {}
            _ => return Err(unauthorized(first_item).into()),
        }
    }

    let mut items: HashMap<ItemId, Item> = HashMap::with_capacity(assignments.len());
    for assignment in assignments {
        let item = tx
            .item_get(assignment.item_id)
            .await?
            .filter(|item| touched.contains_key(&item.container_id))
            .ok_or_else(|| unauthorized(assignment.item_id))?;
        items.insert(assignment.item_id, item);
    }

    if policy == ReorderPolicy::Strict {
        validate_batch(tx, assignments, &items, touched.keys().copied()).await?;
    }

    tx.item_set_ranks(assignments).await?;
    Ok(touched.len())
}

/// Reject batches that would leave any affected container non-dense.
async fn validate_batch<I>(
    tx: &mut dyn RankTransaction,
    assignments: &[RankAssignment],
    items: &HashMap<ItemId, Item>,
    containers: I,
) -> RanklistResult<()>
where
    I: Iterator<Item = ContainerId>,
{
    let mut seen: HashSet<ItemId> = HashSet::with_capacity(assignments.len());
    for assignment in assignments {
        let container_id = items.get(&assignment.item_id).map(|i| i.container_id);
        let invalid = |reason: String| RankError::InvalidOrdering {
            container_id,
            reason,
        };

        if !seen.insert(assignment.item_id) {
            return Err(invalid(format!("item {} listed more than once", assignment.item_id)).into());
        }
        if assignment.rank < 1 {
            return Err(invalid(format!(
                "rank {} for item {} is not positive",
                assignment.rank, assignment.item_id
            ))
            .into());
        }
        if items
            .get(&assignment.item_id)
            .is_some_and(|item| item.is_tombstoned())
        {
            return Err(invalid(format!("item {} is tombstoned", assignment.item_id)).into());
        }
    }

    let requested: HashMap<ItemId, Rank> =
        assignments.iter().map(|a| (a.item_id, a.rank)).collect();

    for container_id in containers {
        let projected = tx
            .live_items(container_id)
            .await?
            .into_iter()
            .map(|item| requested.get(&item.item_id).copied().unwrap_or(item.rank));
        ensure_dense(container_id, projected)?;
    }
    Ok(())
}
