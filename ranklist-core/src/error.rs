//! Error types for ranklist operations

use crate::{ContainerId, ItemId, OwnerId, Rank};
use thiserror::Error;

/// Ranking rule violations raised by the position engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RankError {
    #[error("Container not found: {container_id}")]
    ContainerNotFound { container_id: ContainerId },

    #[error("Item not found: {item_id}")]
    ItemNotFound { item_id: ItemId },

    #[error("Container {container_id} is full (max {max_items} items, {live_count} live)")]
    CapacityExceeded {
        container_id: ContainerId,
        max_items: i32,
        live_count: i64,
    },

    #[error("Owner {owner_id} is not allowed to reorder item {item_id}")]
    Unauthorized { owner_id: OwnerId, item_id: ItemId },

    #[error("Invalid ordering for container {container_id:?}: {reason}")]
    InvalidOrdering {
        container_id: Option<ContainerId>,
        reason: String,
    },
}

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Query failed in {operation}: {reason}")]
    QueryFailed { operation: String, reason: String },

    #[error("Failed to decode {entity} row: {reason}")]
    RowDecode { entity: String, reason: String },
}

/// Input validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid rank {rank}: ranks start at 1")]
    InvalidRank { rank: Rank },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Incompatible options: {option_a} and {option_b}")]
    IncompatibleOptions { option_a: String, option_b: String },
}

/// Master error type for all ranklist errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RanklistError {
    #[error("Rank error: {0}")]
    Rank(#[from] RankError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl RanklistError {
    /// Whether the failure came from the store aborting the transaction.
    ///
    /// Callers may retry these once; every other error is deterministic.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RanklistError::Storage(
                StorageError::TransactionFailed { .. } | StorageError::ConnectionFailed { .. }
            )
        )
    }

    /// Whether the error means "entity missing or not visible to the caller".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RanklistError::Rank(RankError::ContainerNotFound { .. } | RankError::ItemNotFound { .. })
        )
    }
}

/// Result type alias for ranklist operations.
pub type RanklistResult<T> = Result<T, RanklistError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntityIdType;
    use uuid::Uuid;

    #[test]
    fn test_capacity_error_display_carries_limit() {
        let err = RankError::CapacityExceeded {
            container_id: ContainerId::new(Uuid::nil()),
            max_items: 10,
            live_count: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("is full"));
        assert!(msg.contains("max 10"));
    }

    #[test]
    fn test_invalid_rank_display() {
        let msg = ValidationError::InvalidRank { rank: 0 }.to_string();
        assert!(msg.contains("Invalid rank 0"));
    }

    #[test]
    fn test_transient_classification() {
        let tx = RanklistError::from(StorageError::TransactionFailed {
            reason: "serialization failure".to_string(),
        });
        assert!(tx.is_transient());

        let conn = RanklistError::from(StorageError::ConnectionFailed {
            reason: "reset".to_string(),
        });
        assert!(conn.is_transient());

        let decode = RanklistError::from(StorageError::RowDecode {
            entity: "item".to_string(),
            reason: "bad column".to_string(),
        });
        assert!(!decode.is_transient());

        let capacity = RanklistError::from(RankError::CapacityExceeded {
            container_id: ContainerId::now_v7(),
            max_items: 1,
            live_count: 1,
        });
        assert!(!capacity.is_transient());
    }

    #[test]
    fn test_not_found_classification() {
        let item = RanklistError::from(RankError::ItemNotFound {
            item_id: ItemId::now_v7(),
        });
        assert!(item.is_not_found());

        let unauthorized = RanklistError::from(RankError::Unauthorized {
            owner_id: OwnerId::now_v7(),
            item_id: ItemId::now_v7(),
        });
        assert!(!unauthorized.is_not_found());
    }

    #[test]
    fn test_ranklist_error_from_variants() {
        let storage = RanklistError::from(StorageError::QueryFailed {
            operation: "shift_live_ranks".to_string(),
            reason: "out of range".to_string(),
        });
        assert!(matches!(storage, RanklistError::Storage(_)));

        let validation = RanklistError::from(ValidationError::RequiredFieldMissing {
            field: "title".to_string(),
        });
        assert!(matches!(validation, RanklistError::Validation(_)));

        let config = RanklistError::from(ConfigError::IncompatibleOptions {
            option_a: "default_max_items".to_string(),
            option_b: "max_items_ceiling".to_string(),
        });
        assert!(matches!(config, RanklistError::Config(_)));
    }
}
