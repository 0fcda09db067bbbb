//! Pure helpers over rank sequences.
//!
//! Nothing here touches storage. The engine feeds these functions the live
//! ranks it read inside a transaction and acts on the answer.

use crate::{ContainerId, Rank, RankError, RanklistResult, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resolve a caller-requested insert position against the live count.
///
/// Ranks below 1 are rejected. Anything past `live_count + 1` is clamped to
/// `live_count + 1`, which is an append.
pub fn clamp_requested_rank(requested: Rank, live_count: i64) -> RanklistResult<Rank> {
    if requested < 1 {
        return Err(ValidationError::InvalidRank { rank: requested }.into());
    }
    let tail = next_tail_rank(live_count);
    Ok(requested.min(tail))
}

/// Rank of the slot right after `live_count` dense items.
pub fn next_tail_rank(live_count: i64) -> Rank {
    Rank::try_from(live_count.saturating_add(1)).unwrap_or(Rank::MAX)
}

/// Density report for one container's live ranks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankAudit {
    pub live_count: i64,
    /// Ranks held by more than one live item.
    pub duplicates: Vec<Rank>,
    /// Ranks in `1..=live_count` held by nobody.
    pub gaps: Vec<Rank>,
    /// Ranks outside `1..=live_count`.
    pub out_of_range: Vec<Rank>,
}

impl RankAudit {
    /// Whether the live ranks are exactly `1..=live_count`.
    pub fn is_dense(&self) -> bool {
        self.duplicates.is_empty() && self.gaps.is_empty() && self.out_of_range.is_empty()
    }

    /// Human readable description of the first problem found.
    pub fn describe(&self) -> Option<String> {
        if let Some(rank) = self.duplicates.first() {
            return Some(format!("rank {} is assigned more than once", rank));
        }
        if let Some(rank) = self.out_of_range.first() {
            return Some(format!(
                "rank {} is outside 1..={}",
                rank, self.live_count
            ));
        }
        if let Some(rank) = self.gaps.first() {
            return Some(format!("rank {} is missing", rank));
        }
        None
    }
}

/// Audit a collection of live ranks.
pub fn audit_ranks<I>(ranks: I) -> RankAudit
where
    I: IntoIterator<Item = Rank>,
{
    let mut counts: BTreeMap<Rank, usize> = BTreeMap::new();
    let mut live_count: i64 = 0;
    for rank in ranks {
        *counts.entry(rank).or_default() += 1;
        live_count += 1;
    }

    let mut audit = RankAudit {
        live_count,
        ..RankAudit::default()
    };

    for (&rank, &count) in &counts {
        if count > 1 {
            audit.duplicates.push(rank);
        }
        if rank < 1 || i64::from(rank) > live_count {
            audit.out_of_range.push(rank);
        }
    }

    let upper = Rank::try_from(live_count).unwrap_or(Rank::MAX);
    audit.gaps = (1..=upper).filter(|r| !counts.contains_key(r)).collect();
    audit
}

/// Fail with `InvalidOrdering` unless `ranks` are exactly `1..=N`.
pub fn ensure_dense<I>(container_id: ContainerId, ranks: I) -> RanklistResult<()>
where
    I: IntoIterator<Item = Rank>,
{
    let audit = audit_ranks(ranks);
    match audit.describe() {
        None => Ok(()),
        Some(reason) => Err(RankError::InvalidOrdering {
            container_id: Some(container_id),
            reason,
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EntityIdType, RanklistError};
    use proptest::prelude::*;

    #[test]
    fn test_clamp_inside_range_is_kept() {
        assert_eq!(clamp_requested_rank(2, 3).ok(), Some(2));
        assert_eq!(clamp_requested_rank(4, 3).ok(), Some(4));
    }

    #[test]
    fn test_clamp_past_tail_appends() {
        assert_eq!(clamp_requested_rank(99, 3).ok(), Some(4));
        assert_eq!(clamp_requested_rank(5, 0).ok(), Some(1));
    }

    #[test]
    fn test_clamp_rejects_non_positive() {
        let err = clamp_requested_rank(0, 3).unwrap_err();
        assert!(matches!(
            err,
            RanklistError::Validation(ValidationError::InvalidRank { rank: 0 })
        ));
        assert!(clamp_requested_rank(-4, 3).is_err());
    }

    #[test]
    fn test_audit_empty_is_dense() {
        let audit = audit_ranks(Vec::new());
        assert!(audit.is_dense());
        assert_eq!(audit.live_count, 0);
    }

    #[test]
    fn test_audit_reports_gap_and_duplicate() {
        let audit = audit_ranks(vec![1, 2, 2, 5]);
        assert!(!audit.is_dense());
        assert_eq!(audit.duplicates, vec![2]);
        assert_eq!(audit.gaps, vec![3, 4]);
        assert_eq!(audit.out_of_range, vec![5]);
        assert_eq!(
            audit.describe().as_deref(),
            Some("rank 2 is assigned more than once")
        );
    }

    #[test]
    fn test_ensure_dense_accepts_shuffled_sequence() {
        assert!(ensure_dense(ContainerId::now_v7(), vec![3, 1, 2]).is_ok());
    }

    #[test]
    fn test_ensure_dense_rejects_gap() {
        let err = ensure_dense(ContainerId::now_v7(), vec![1, 3]).unwrap_err();
        assert!(matches!(
            err,
            RanklistError::Rank(RankError::InvalidOrdering { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_any_permutation_is_dense(n in 0usize..40, seed in any::<u64>()) {
            let mut ranks: Vec<Rank> = (1..=n as Rank).collect();
            // deterministic shuffle driven by the seed
            let mut state = seed;
            for i in (1..ranks.len()).rev() {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let j = (state >> 33) as usize % (i + 1);
                ranks.swap(i, j);
            }
            prop_assert!(audit_ranks(ranks).is_dense());
        }

        #[test]
        fn prop_clamped_rank_never_exceeds_tail(requested in 1i32..1000, live in 0i64..200) {
            let rank = clamp_requested_rank(requested, live).unwrap();
            prop_assert!(rank >= 1);
            prop_assert!(i64::from(rank) <= live + 1);
        }
    }
}
