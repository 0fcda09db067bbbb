//! Ranklist Engine - Ordered-Collection Position Engine
//!
//! Keeps the live ranks of every container dense (`1..N`, no gaps, no
//! duplicates) and bounded by the container's capacity across five mutation
//! paths:
//!
//! - Rank Sequencer ([`RankEngine::insert`])
//! - Capacity Guard ([`CapacityGuard`])
//! - Tombstone Compactor ([`RankEngine::soft_delete`])
//! - Restore Reintegrator ([`RankEngine::restore`])
//! - Bulk Reorder Transactor ([`RankEngine::bulk_reorder`])
//!
//! Every public operation opens exactly one store transaction, commits it on
//! success and rolls it back on any error. Callers never see a transaction.

pub mod attributes;
pub mod capacity;
pub mod containers;
pub mod queries;
pub mod reorder;
pub mod restore;
pub mod sequencer;
pub mod tombstone;

pub use capacity::CapacityGuard;

use ranklist_core::{
    Container, ContainerId, EngineConfig, Item, ItemId, OwnerId, RankError, RanklistResult,
};
use ranklist_storage::{RankStore, RankTransaction};

/// The position engine over a store `S`.
#[derive(Debug, Clone)]
pub struct RankEngine<S> {
    store: S,
    config: EngineConfig,
}

impl<S: RankStore> RankEngine<S> {
    /// Create an engine after validating `config`.
    pub fn new(store: S, config: EngineConfig) -> RanklistResult<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    /// Create an engine with the default configuration.
    pub fn with_defaults(store: S) -> Self {
        Self {
            store,
            config: EngineConfig::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Commit on success, roll back on failure, and hand the result back.
    async fn finish<T>(
        &self,
        mut tx: Box<dyn RankTransaction>,
        operation: &'static str,
        result: RanklistResult<T>,
    ) -> RanklistResult<T> {
        match result {
            Ok(value) => match tx.commit().await {
                Ok(()) => {
                    tracing::debug!(operation, "committed");
                    Ok(value)
                }
                Err(err) => {
                    tracing::error!(operation, error = %err, "commit failed");
                    Err(err)
                }
            },
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(operation, error = %rollback_err, "rollback failed");
                }
                if err.is_transient() {
                    tracing::error!(operation, error = %err, "transaction aborted");
                } else {
                    tracing::warn!(operation, error = %err, "rejected");
                }
                Err(err)
            }
        }
    }
}

/// Lock a container the caller owns. Missing and foreign containers are
/// indistinguishable to the caller.
pub(crate) async fn lock_owned_container(
    tx: &mut dyn RankTransaction,
    owner_id: OwnerId,
    container_id: ContainerId,
) -> RanklistResult<Container> {
    match tx.container_lock(container_id).await? {
        Some(container) if container.is_owned_by(owner_id) => Ok(container),
        _ => Err(RankError::ContainerNotFound { container_id }.into()),
    }
}

/// Resolve an item the caller owns and lock its container.
///
/// The item is read again after the lock is held so its rank and tombstone
/// reflect every transaction that committed before ours.
pub(crate) async fn lock_owned_item(
    tx: &mut dyn RankTransaction,
    owner_id: OwnerId,
    item_id: ItemId,
) -> RanklistResult<(Container, Item)> {
    let not_found = || RankError::ItemNotFound { item_id };

    let unlocked = tx.item_get(item_id).await?.ok_or_else(not_found)?;
    let container = match tx.container_lock(unlocked.container_id).await? {
        Some(container) if container.is_owned_by(owner_id) => container,
        _ => return Err(not_found().into()),
    };

    let item = tx
        .item_get(item_id)
        .await?
        .filter(|item| item.container_id == container.container_id)
        .ok_or_else(not_found)?;
    Ok((container, item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ranklist_core::{EntityIdType, ItemAttributes, NewContainer};
    use ranklist_storage::MemoryRankStore;
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing::{Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
    use tracing_subscriber::Registry;

    #[derive(Debug, Clone, Default)]
    struct CapturedEvent {
        level: Option<Level>,
        message: String,
        operation: String,
    }

    impl Visit for CapturedEvent {
        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            match field.name() {
                "message" => self.message = format!("{value:?}"),
                "operation" => self.operation = format!("{value:?}"),
                _ => {}
            }
        }

        fn record_str(&mut self, field: &Field, value: &str) {
            match field.name() {
                "message" => self.message = value.to_string(),
                "operation" => self.operation = value.to_string(),
                _ => {}
            }
        }
    }

    struct CaptureLayer {
        events: Arc<Mutex<Vec<CapturedEvent>>>,
    }

    impl<S: Subscriber> Layer<S> for CaptureLayer {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let mut captured = CapturedEvent {
                level: Some(*event.metadata().level()),
                ..CapturedEvent::default()
            };
            event.record(&mut captured);
            self.events.lock().expect("event capture").push(captured);
        }
    }

    #[tokio::test]
    async fn test_commit_failure_logged_at_error() -> RanklistResult<()> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let subscriber = Registry::default().with(CaptureLayer {
            events: Arc::clone(&events),
        });
        let _default = tracing::subscriber::set_default(subscriber);

        let engine = RankEngine::with_defaults(MemoryRankStore::new());
        let owner = OwnerId::now_v7();
        let container = engine
            .create_container(owner, NewContainer::named("Logged"))
            .await?
            .container_id;

        engine.store().fail_next_commit();
        let err = engine
            .insert(owner, container, ItemAttributes::titled("lost"), None)
            .await
            .unwrap_err();
        assert!(err.is_transient());

        let captured = events.lock().expect("event capture").clone();
        assert!(
            captured.iter().any(|e| e.level == Some(Level::ERROR)
                && e.message == "commit failed"
                && e.operation == "insert"),
            "no error-level commit failure in {:?}",
            captured
        );
        assert!(!captured.iter().any(|e| e.message == "item inserted"));
        Ok(())
    }
}
