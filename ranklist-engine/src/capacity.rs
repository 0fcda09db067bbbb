//! Capacity Guard
//!
//! Answers whether a container can take `n` more live items. It never writes;
//! it is always evaluated inside the transaction of the insert or restore it
//! guards, after the container row is locked.

use ranklist_core::{Container, ContainerId, RankError, RanklistResult};
use ranklist_storage::RankTransaction;

/// Snapshot of a container's capacity taken inside a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityGuard {
    container_id: ContainerId,
    max_items: i32,
    live_count: i64,
}

impl CapacityGuard {
    pub fn new(container: &Container, live_count: i64) -> Self {
        Self {
            container_id: container.container_id,
            max_items: container.max_items,
            live_count,
        }
    }

    /// Read the live count of `container` and build a guard from it.
    pub async fn load(tx: &mut dyn RankTransaction, container: &Container) -> RanklistResult<Self> {
        let live_count = tx.live_count(container.container_id).await?;
        Ok(Self::new(container, live_count))
    }

    pub fn live_count(&self) -> i64 {
        self.live_count
    }

    /// Free slots left; zero when the container is at or over capacity.
    pub fn remaining(&self) -> i64 {
        (i64::from(self.max_items) - self.live_count).max(0)
    }

    /// Whether adding `incoming` live items would exceed `max_items`.
    pub fn would_exceed(&self, incoming: i64) -> bool {
        self.live_count.saturating_add(incoming) > i64::from(self.max_items)
    }

    /// Fail with `CapacityExceeded` if `incoming` items do not fit.
    pub fn admit(&self, incoming: i64) -> RanklistResult<()> {
        if self.would_exceed(incoming) {
            return Err(RankError::CapacityExceeded {
                container_id: self.container_id,
                max_items: self.max_items,
                live_count: self.live_count,
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ranklist_core::{EntityIdType, OwnerId, RanklistError};

    fn container(max_items: i32) -> Container {
        Container::new(OwnerId::now_v7(), "Books", false, max_items)
    }

    #[test]
    fn test_admits_below_capacity() {
        let guard = CapacityGuard::new(&container(3), 2);
        assert!(!guard.would_exceed(1));
        assert!(guard.admit(1).is_ok());
        assert_eq!(guard.remaining(), 1);
    }

    #[test]
    fn test_rejects_at_capacity() {
        let c = container(3);
        let guard = CapacityGuard::new(&c, 3);
        assert!(guard.would_exceed(1));
        let err = guard.admit(1).unwrap_err();
        assert_eq!(
            err,
            RanklistError::Rank(RankError::CapacityExceeded {
                container_id: c.container_id,
                max_items: 3,
                live_count: 3,
            })
        );
    }

    #[test]
    fn test_lowered_capacity_reports_no_room() {
        let guard = CapacityGuard::new(&container(2), 5);
        assert_eq!(guard.remaining(), 0);
        assert!(guard.would_exceed(0));
    }

    #[test]
    fn test_zero_incoming_fits_full_container() {
        let guard = CapacityGuard::new(&container(4), 4);
        assert!(guard.admit(0).is_ok());
        assert!(guard.admit(1).is_err());
    }
}
