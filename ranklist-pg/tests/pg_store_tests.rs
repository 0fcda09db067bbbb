#![cfg(feature = "db-tests")]
//! Engine scenarios against a live PostgreSQL.
//!
//! Requires `RANKLIST_DB_*` to point at a database the tests may write to.

use ranklist_engine::RankEngine;
use ranklist_pg::{DbConfig, PgRankStore};
use ranklist_test_utils::assertions::{assert_capacity_exceeded, assert_dense, assert_order};
use ranklist_test_utils::{
    init_tracing, EngineConfig, EntityIdType, ItemAttributes, ItemId, NewContainer, OwnerId,
    RankAssignment, RanklistResult,
};
use std::sync::Arc;

async fn test_engine() -> RanklistResult<RankEngine<PgRankStore>> {
    init_tracing();
    let store = PgRankStore::from_config(&DbConfig::from_env())?;
    store.migrate().await?;
    RankEngine::new(store, EngineConfig::default())
}

#[tokio::test]
async fn test_insert_delete_restore_round() -> RanklistResult<()> {
    let engine = test_engine().await?;
    let owner = OwnerId::now_v7();
    let container = engine
        .create_container(owner, NewContainer::named("pg round").with_max_items(4))
        .await?
        .container_id;

    let mut ids: Vec<ItemId> = Vec::new();
    for title in ["A", "B", "C"] {
        ids.push(
            engine
                .insert(owner, container, ItemAttributes::titled(title), None)
                .await?
                .item_id,
        );
    }
    let n = engine
        .insert(owner, container, ItemAttributes::titled("N"), Some(2))
        .await?;
    assert_order(
        &engine.live_items(container).await?,
        &[ids[0], n.item_id, ids[1], ids[2]],
    );

    let full = engine
        .insert(owner, container, ItemAttributes::titled("overflow"), None)
        .await;
    assert_capacity_exceeded(&full);

    engine.soft_delete(owner, ids[0]).await?;
    let live = engine.live_items(container).await?;
    assert_dense(&live);
    assert_order(&live, &[n.item_id, ids[1], ids[2]]);

    let rank = engine.restore(owner, ids[0]).await?;
    assert_eq!(rank, 4);

    engine
        .bulk_reorder(
            owner,
            vec![
                RankAssignment::new(ids[0], 1),
                RankAssignment::new(n.item_id, 4),
            ],
        )
        .await?;
    assert_order(
        &engine.live_items(container).await?,
        &[ids[0], ids[1], ids[2], n.item_id],
    );

    assert_eq!(engine.delete_container(owner, container).await?, 4);
    Ok(())
}

#[tokio::test]
async fn test_attribute_update_and_unlocked_reads() -> RanklistResult<()> {
    let engine = test_engine().await?;
    let owner = OwnerId::now_v7();
    let container = engine
        .create_container(owner, NewContainer::named("pg edit"))
        .await?
        .container_id;
    let a = engine
        .insert(owner, container, ItemAttributes::titled("draft"), None)
        .await?;

    let edited = ItemAttributes::titled("final")
        .with_description("edited in place")
        .with_image_url("https://img.example.com/final.png");
    let item = engine.update_attributes(owner, a.item_id, edited.clone()).await?;
    assert_eq!(item.rank, 1);

    let live = engine.live_items(container).await?;
    assert_eq!(live[0].attributes, edited);
    assert!(engine.audit(container).await?.is_dense());

    engine.delete_container(owner, container).await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_inserts_at_head() -> RanklistResult<()> {
    let engine = Arc::new(test_engine().await?);
    let owner = OwnerId::now_v7();
    let container = engine
        .create_container(owner, NewContainer::named("pg race").with_max_items(8))
        .await?
        .container_id;

    let mut handles = Vec::new();
    for n in 0..12 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            engine
                .insert(owner, container, ItemAttributes::titled(format!("h{}", n)), Some(1))
                .await
        }));
    }
    let mut admitted = 0;
    for handle in handles {
        if let Ok(Ok(_)) = handle.await {
            admitted += 1;
        }
    }

    assert_eq!(admitted, 8);
    assert_dense(&engine.live_items(container).await?);
    engine.delete_container(owner, container).await?;
    Ok(())
}
