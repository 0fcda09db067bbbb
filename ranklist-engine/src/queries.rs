//! Read paths: live ordering, trash listing, density audit.

use crate::RankEngine;
use ranklist_core::{
    audit_ranks, ContainerId, Item, OwnerId, RankAudit, RankError, RanklistResult,
};
use ranklist_storage::{RankStore, RankTransaction};

impl<S: RankStore> RankEngine<S> {
    /// Live items of a container, rank ascending.
    pub async fn live_items(&self, container_id: ContainerId) -> RanklistResult<Vec<Item>> {
        let mut tx = self.store.begin().await?;
        let result = live_items_in_tx(tx.as_mut(), container_id).await;
        self.finish(tx, "live_items", result).await
    }

    /// Tombstoned items across the owner's containers, newest first.
    ///
    /// `limit` is capped at the configured recently-deleted limit. The rank
    /// on each returned item is its frozen pre-deletion value and carries no
    /// positional meaning.
    pub async fn recently_deleted(
        &self,
        owner_id: OwnerId,
        limit: Option<i64>,
    ) -> RanklistResult<Vec<Item>> {
        let cap = self.config.recently_deleted_limit;
        let limit = limit.map_or(cap, |l| l.clamp(0, cap));

        let mut tx = self.store.begin().await?;
        let result = tx.tombstoned_for_owner(owner_id, limit).await;
        self.finish(tx, "recently_deleted", result).await
    }

    /// Check that a container's live ranks are exactly `1..N`.
    pub async fn audit(&self, container_id: ContainerId) -> RanklistResult<RankAudit> {
        let mut tx = self.store.begin().await?;
        let result = live_items_in_tx(tx.as_mut(), container_id).await;
        let items = self.finish(tx, "audit", result).await?;

        let audit = audit_ranks(items.iter().map(|i| i.rank));
        if let Some(problem) = audit.describe() {
            tracing::warn!(%container_id, problem, "container ranks are not dense");
        }
        Ok(audit)
    }
}

async fn live_items_in_tx(
    tx: &mut dyn RankTransaction,
    container_id: ContainerId,
) -> RanklistResult<Vec<Item>> {
    if tx.container_get(container_id).await?.is_none() {
        return Err(RankError::ContainerNotFound { container_id }.into());
    }
    tx.live_items(container_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use ranklist_core::{EngineConfig, EntityIdType, ItemAttributes, NewContainer};
    use ranklist_storage::MemoryRankStore;

    #[tokio::test]
    async fn test_live_items_of_missing_container() -> RanklistResult<()> {
        let engine = RankEngine::with_defaults(MemoryRankStore::new());
        let err = engine.live_items(ContainerId::now_v7()).await.unwrap_err();
        assert!(err.is_not_found());
        Ok(())
    }

    #[tokio::test]
    async fn test_recently_deleted_is_capped() -> RanklistResult<()> {
        let config = EngineConfig {
            recently_deleted_limit: 2,
            ..EngineConfig::default()
        };
        let engine = RankEngine::new(MemoryRankStore::new(), config)?;
        let owner = OwnerId::now_v7();
        let container = engine
            .create_container(owner, NewContainer::named("Trash test"))
            .await?
            .container_id;
        let mut ids = Vec::new();
        for n in 0..3 {
            ids.push(
                engine
                    .insert(owner, container, ItemAttributes::titled(format!("i{}", n)), None)
                    .await?
                    .item_id,
            );
        }
        for id in &ids {
            engine.soft_delete(owner, *id).await?;
        }

        assert_eq!(engine.recently_deleted(owner, None).await?.len(), 2);
        assert_eq!(engine.recently_deleted(owner, Some(1)).await?.len(), 1);
        assert_eq!(engine.recently_deleted(owner, Some(500)).await?.len(), 2);
        assert!(engine
            .recently_deleted(OwnerId::now_v7(), None)
            .await?
            .is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_audit_flags_corruption() -> RanklistResult<()> {
        let engine = RankEngine::with_defaults(MemoryRankStore::new());
        let owner = OwnerId::now_v7();
        let container = engine
            .create_container(owner, NewContainer::named("Audit"))
            .await?
            .container_id;
        engine
            .insert(owner, container, ItemAttributes::titled("a"), None)
            .await?;
        assert!(engine.audit(container).await?.is_dense());

        let rogue = Item::new(container, 1, ItemAttributes::titled("rogue"));
        engine.store().put_item_unchecked(rogue).await;

        let audit = engine.audit(container).await?;
        assert!(!audit.is_dense());
        assert_eq!(audit.duplicates, vec![1]);
        Ok(())
    }
}
