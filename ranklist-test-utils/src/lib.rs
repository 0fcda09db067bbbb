//! Ranklist Test Utilities
//!
//! Shared test infrastructure for the ranklist workspace:
//! - Proptest generators for entities and operation sequences
//! - Fixtures that seed an engine with a populated container
//! - Assertions for rank density and error variants
//! - A tracing subscriber for test output

// Re-export the in-memory store from its source crate
pub use ranklist_storage::{MemoryRankStore, StoreStatistics};

// Re-export core types for convenience
pub use ranklist_core::{
    audit_ranks, Container, ContainerId, EngineConfig, EntityIdType, InsertOutcome, Item,
    ItemAttributes, ItemId, NewContainer, OwnerId, Rank, RankAssignment, RankAudit, RankError,
    RanklistError, RanklistResult, ReorderPolicy, StorageError, ValidationError,
};
pub use ranklist_engine::RankEngine;

/// Install a test-writer subscriber once per process.
///
/// Honors `RUST_LOG`; defaults to `warn`.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

// ============================================================================
// GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for ranklist types.

    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    // === Identity Generators ===

    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    pub fn arb_container_id() -> impl Strategy<Value = ContainerId> {
        arb_uuid().prop_map(ContainerId::new)
    }

    pub fn arb_item_id() -> impl Strategy<Value = ItemId> {
        arb_uuid().prop_map(ItemId::new)
    }

    pub fn arb_owner_id() -> impl Strategy<Value = OwnerId> {
        arb_uuid().prop_map(OwnerId::new)
    }

    // === Attribute Generators ===

    /// Titles within the accepted 1..=200 character range.
    pub fn arb_title() -> impl Strategy<Value = String> {
        "[A-Za-z0-9][A-Za-z0-9 ]{0,40}"
    }

    /// Attributes that pass validation.
    pub fn arb_item_attributes() -> impl Strategy<Value = ItemAttributes> {
        (
            arb_title(),
            prop::option::of("[a-z ]{0,80}"),
            prop::option::of("https://img\\.example\\.com/[a-z0-9]{1,16}\\.jpg"),
            prop::option::of("[a-z ]{0,80}"),
            any::<bool>(),
        )
            .prop_map(|(title, description, image_url, notes, is_private)| ItemAttributes {
                title,
                description,
                image_url,
                notes,
                is_private,
                ..ItemAttributes::default()
            })
    }

    // === Operation Sequences ===

    /// One step of a randomized engine workload.
    ///
    /// `pick` values select among the items the workload has created so far,
    /// modulo their count.
    #[derive(Debug, Clone)]
    pub enum RankOp {
        Insert {
            attributes: ItemAttributes,
            requested_rank: Option<Rank>,
        },
        SoftDelete { pick: usize },
        Restore { pick: usize },
        PermanentDelete { pick: usize },
        Rotate { by: usize },
        Resize { max_items: i32 },
    }

    pub fn arb_rank_op(max_rank: Rank) -> impl Strategy<Value = RankOp> {
        prop_oneof![
            4 => (arb_item_attributes(), prop::option::of(1..=max_rank))
                .prop_map(|(attributes, requested_rank)| RankOp::Insert { attributes, requested_rank }),
            3 => any::<usize>().prop_map(|pick| RankOp::SoftDelete { pick }),
            2 => any::<usize>().prop_map(|pick| RankOp::Restore { pick }),
            1 => any::<usize>().prop_map(|pick| RankOp::PermanentDelete { pick }),
            2 => (0usize..16).prop_map(|by| RankOp::Rotate { by }),
            1 => (1i32..=max_rank).prop_map(|max_items| RankOp::Resize { max_items }),
        ]
    }

    pub fn arb_rank_ops(max_rank: Rank, len: usize) -> impl Strategy<Value = Vec<RankOp>> {
        prop::collection::vec(arb_rank_op(max_rank), 1..=len)
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built engines and containers.

    use super::*;

    /// A container populated by [`seed_container`].
    #[derive(Debug, Clone)]
    pub struct Seeded {
        pub owner_id: OwnerId,
        pub container_id: ContainerId,
        /// Item IDs in insertion order, which is also their initial rank order.
        pub item_ids: Vec<ItemId>,
    }

    /// Engine over a fresh in-memory store with the given reorder policy.
    pub fn memory_engine(policy: ReorderPolicy) -> RanklistResult<RankEngine<MemoryRankStore>> {
        RankEngine::new(
            MemoryRankStore::new(),
            EngineConfig::default().with_reorder_policy(policy),
        )
    }

    /// Create a container for a new owner and append `count` items titled
    /// `item 0`, `item 1`, ...
    pub async fn seed_container(
        engine: &RankEngine<MemoryRankStore>,
        max_items: i32,
        count: usize,
    ) -> RanklistResult<Seeded> {
        let owner_id = OwnerId::now_v7();
        let container_id = engine
            .create_container(owner_id, NewContainer::named("fixture").with_max_items(max_items))
            .await?
            .container_id;

        let mut item_ids = Vec::with_capacity(count);
        for n in 0..count {
            let outcome = engine
                .insert(owner_id, container_id, ItemAttributes::titled(format!("item {}", n)), None)
                .await?;
            item_ids.push(outcome.item_id);
        }

        Ok(Seeded {
            owner_id,
            container_id,
            item_ids,
        })
    }

    /// Reorder batch that rotates the given live order left by `by`.
    pub fn rotation(live: &[Item], by: usize) -> Vec<RankAssignment> {
        if live.is_empty() {
            return Vec::new();
        }
        let shift = by % live.len();
        live.iter()
            .enumerate()
            .map(|(idx, item)| {
                let target = (idx + live.len() - shift) % live.len();
                RankAssignment::new(item.item_id, target as Rank + 1)
            })
            .collect()
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for ranklist invariants and error variants.

    use super::*;

    /// Assert that live items carry exactly the ranks `1..=N`.
    #[track_caller]
    pub fn assert_dense(live: &[Item]) {
        let audit = audit_ranks(live.iter().map(|i| i.rank));
        assert!(
            audit.is_dense(),
            "Expected dense ranks, got {:?}: {:?}",
            live.iter().map(|i| i.rank).collect::<Vec<_>>(),
            audit.describe()
        );
        assert!(
            live.iter().all(Item::is_live),
            "Expected only live items in the listing"
        );
    }

    /// Assert that `live` holds exactly `expected` in rank order.
    #[track_caller]
    pub fn assert_order(live: &[Item], expected: &[ItemId]) {
        let actual: Vec<ItemId> = live.iter().map(|i| i.item_id).collect();
        assert_eq!(actual, expected, "Unexpected live order");
    }

    #[track_caller]
    pub fn assert_capacity_exceeded<T: std::fmt::Debug>(result: &RanklistResult<T>) {
        match result {
            Err(RanklistError::Rank(RankError::CapacityExceeded { .. })) => {}
            other => panic!("Expected CapacityExceeded, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &RanklistResult<T>) {
        match result {
            Err(err) if err.is_not_found() => {}
            other => panic!("Expected a not-found error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_unauthorized<T: std::fmt::Debug>(result: &RanklistResult<T>, item_id: ItemId) {
        match result {
            Err(RanklistError::Rank(RankError::Unauthorized { item_id: got, .. })) => {
                assert_eq!(*got, item_id, "Wrong item in Unauthorized error");
            }
            other => panic!("Expected Unauthorized for {}, got: {:?}", item_id, other),
        }
    }

    #[track_caller]
    pub fn assert_invalid_ordering<T: std::fmt::Debug>(result: &RanklistResult<T>) {
        match result {
            Err(RanklistError::Rank(RankError::InvalidOrdering { .. })) => {}
            other => panic!("Expected InvalidOrdering, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_transient<T: std::fmt::Debug>(result: &RanklistResult<T>) {
        match result {
            Err(err) if err.is_transient() => {}
            other => panic!("Expected a transient storage error, got: {:?}", other),
        }
    }
}
