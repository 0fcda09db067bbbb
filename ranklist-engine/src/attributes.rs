//! Item attribute edits.
//!
//! Attributes are opaque to ranking, so an edit never moves a rank. The
//! owning container is still locked so an edit cannot interleave with a
//! permanent delete of the same item.

use crate::{lock_owned_item, RankEngine};
use ranklist_core::{Item, ItemAttributes, ItemId, OwnerId, RanklistResult};
use ranklist_storage::{RankStore, RankTransaction};
use tracing::Instrument;

impl<S: RankStore> RankEngine<S> {
    /// Replace the descriptive attributes of an item the caller owns.
    ///
    /// Works on live and tombstoned items alike. Returns the updated item.
    pub async fn update_attributes(
        &self,
        owner_id: OwnerId,
        item_id: ItemId,
        attributes: ItemAttributes,
    ) -> RanklistResult<Item> {
        let span = tracing::info_span!("rank_update_attributes", %owner_id, %item_id);
        self.update_attributes_inner(owner_id, item_id, attributes)
            .instrument(span)
            .await
    }

    async fn update_attributes_inner(
        &self,
        owner_id: OwnerId,
        item_id: ItemId,
        attributes: ItemAttributes,
    ) -> RanklistResult<Item> {
        attributes.validate()?;

        let mut tx = self.store.begin().await?;
        let result = update_in_tx(tx.as_mut(), owner_id, item_id, attributes).await;
        let item = self.finish(tx, "update_attributes", result).await?;
        tracing::info!(rank = item.rank, "item attributes updated");
        Ok(item)
    }
}

async fn update_in_tx(
    tx: &mut dyn RankTransaction,
    owner_id: OwnerId,
    item_id: ItemId,
    attributes: ItemAttributes,
) -> RanklistResult<Item> {
    let (_, mut item) = lock_owned_item(tx, owner_id, item_id).await?;
    tx.item_update_attributes(item_id, &attributes).await?;
    item.attributes = attributes;
    Ok(item)
}
