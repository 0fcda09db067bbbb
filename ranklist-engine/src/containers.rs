//! Container lifecycle: create, resize, delete.

use crate::{lock_owned_container, RankEngine};
use ranklist_core::{
    Container, ContainerId, NewContainer, OwnerId, RanklistResult, ValidationError,
};
use ranklist_storage::{RankStore, RankTransaction};
use tracing::Instrument;

impl<S: RankStore> RankEngine<S> {
    /// Create an empty container owned by `owner_id`.
    pub async fn create_container(
        &self,
        owner_id: OwnerId,
        request: NewContainer,
    ) -> RanklistResult<Container> {
        let span = tracing::info_span!("container_create", %owner_id);
        self.create_container_inner(owner_id, request)
            .instrument(span)
            .await
    }

    async fn create_container_inner(
        &self,
        owner_id: OwnerId,
        request: NewContainer,
    ) -> RanklistResult<Container> {
        request.validate()?;
        let max_items = request.max_items.unwrap_or(self.config.default_max_items);
        self.check_max_items(max_items)?;

        let container = Container::new(owner_id, request.name, request.is_private, max_items);
        let mut tx = self.store.begin().await?;
        let result = tx.container_insert(&container).await;
        self.finish(tx, "create_container", result).await?;
        tracing::info!(container_id = %container.container_id, max_items, "container created");
        Ok(container)
    }

    /// Change a container's capacity.
    ///
    /// Lowering it below the current live count is allowed; existing items
    /// stay, and inserts and restores are refused until enough are removed.
    pub async fn set_max_items(
        &self,
        owner_id: OwnerId,
        container_id: ContainerId,
        max_items: i32,
    ) -> RanklistResult<Container> {
        let span = tracing::info_span!("container_set_max_items", %owner_id, %container_id, max_items);
        self.set_max_items_inner(owner_id, container_id, max_items)
            .instrument(span)
            .await
    }

    async fn set_max_items_inner(
        &self,
        owner_id: OwnerId,
        container_id: ContainerId,
        max_items: i32,
    ) -> RanklistResult<Container> {
        self.check_max_items(max_items)?;
        let mut tx = self.store.begin().await?;
        let result = resize_in_tx(tx.as_mut(), owner_id, container_id, max_items).await;
        self.finish(tx, "set_max_items", result).await
    }

    /// Hard-delete a container and every item in it. Returns the number of
    /// items removed.
    pub async fn delete_container(
        &self,
        owner_id: OwnerId,
        container_id: ContainerId,
    ) -> RanklistResult<u64> {
        let span = tracing::info_span!("container_delete", %owner_id, %container_id);
        self.delete_container_inner(owner_id, container_id)
            .instrument(span)
            .await
    }

    async fn delete_container_inner(
        &self,
        owner_id: OwnerId,
        container_id: ContainerId,
    ) -> RanklistResult<u64> {
        let mut tx = self.store.begin().await?;
        let result = delete_in_tx(tx.as_mut(), owner_id, container_id).await;
        let removed = self.finish(tx, "delete_container", result).await?;
        tracing::info!(removed, "container deleted");
        Ok(removed)
    }

    fn check_max_items(&self, max_items: i32) -> RanklistResult<()> {
        if !(1..=self.config.max_items_ceiling).contains(&max_items) {
            return Err(ValidationError::InvalidValue {
                field: "max_items".to_string(),
                reason: format!(
                    "must be between 1 and {}, got {}",
                    self.config.max_items_ceiling, max_items
                ),
            }
            .into());
        }
        Ok(())
    }
}

async fn resize_in_tx(
    tx: &mut dyn RankTransaction,
    owner_id: OwnerId,
    container_id: ContainerId,
    max_items: i32,
) -> RanklistResult<Container> {
    let mut container = lock_owned_container(tx, owner_id, container_id).await?;
    tx.container_set_max_items(container_id, max_items).await?;
    container.max_items = max_items;
    container.updated_at = chrono::Utc::now();
    Ok(container)
}

async fn delete_in_tx(
    tx: &mut dyn RankTransaction,
    owner_id: OwnerId,
    container_id: ContainerId,
) -> RanklistResult<u64> {
    lock_owned_container(tx, owner_id, container_id).await?;
    tx.container_delete(container_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use ranklist_core::{EntityIdType, ItemAttributes, RankError, RanklistError};
    use ranklist_storage::MemoryRankStore;

    #[tokio::test]
    async fn test_default_capacity_applied() -> RanklistResult<()> {
        let engine = RankEngine::with_defaults(MemoryRankStore::new());
        let container = engine
            .create_container(OwnerId::now_v7(), NewContainer::named("Cities"))
            .await?;
        assert_eq!(container.max_items, 10);
        Ok(())
    }

    #[tokio::test]
    async fn test_capacity_bounds_enforced() -> RanklistResult<()> {
        let engine = RankEngine::with_defaults(MemoryRankStore::new());
        let owner = OwnerId::now_v7();
        for bad in [0, -1, 101] {
            let err = engine
                .create_container(owner, NewContainer::named("x").with_max_items(bad))
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                RanklistError::Validation(ValidationError::InvalidValue { .. })
            ));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_lowered_capacity_blocks_inserts() -> RanklistResult<()> {
        let engine = RankEngine::with_defaults(MemoryRankStore::new());
        let owner = OwnerId::now_v7();
        let container = engine
            .create_container(owner, NewContainer::named("Parks").with_max_items(5))
            .await?
            .container_id;
        for n in 0..3 {
            engine
                .insert(owner, container, ItemAttributes::titled(format!("park {}", n)), None)
                .await?;
        }

        let resized = engine.set_max_items(owner, container, 2).await?;
        assert_eq!(resized.max_items, 2);
        assert_eq!(engine.live_items(container).await?.len(), 3);

        let err = engine
            .insert(owner, container, ItemAttributes::titled("extra"), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RanklistError::Rank(RankError::CapacityExceeded { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_resize_foreign_container_is_not_found() -> RanklistResult<()> {
        let engine = RankEngine::with_defaults(MemoryRankStore::new());
        let container = engine
            .create_container(OwnerId::now_v7(), NewContainer::named("Mine"))
            .await?
            .container_id;
        let err = engine
            .set_max_items(OwnerId::now_v7(), container, 3)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_cascades_to_items() -> RanklistResult<()> {
        let engine = RankEngine::with_defaults(MemoryRankStore::new());
        let owner = OwnerId::now_v7();
        let container = engine
            .create_container(owner, NewContainer::named("Foods"))
            .await?
            .container_id;
        let a = engine
            .insert(owner, container, ItemAttributes::titled("a"), None)
            .await?;
        let b = engine
            .insert(owner, container, ItemAttributes::titled("b"), None)
            .await?;
        engine.soft_delete(owner, b.item_id).await?;

        let removed = engine.delete_container(owner, container).await?;
        assert_eq!(removed, 2);
        assert!(engine.store().item(a.item_id).await.is_none());
        assert!(engine.store().item(b.item_id).await.is_none());
        assert!(engine.store().container(container).await.is_none());
        Ok(())
    }
}
