//! Ranklist Core - Entity Types
//!
//! Pure data structures and rank arithmetic with no I/O. Every other crate in
//! the workspace depends on this one.

pub mod config;
pub mod entities;
pub mod error;
pub mod identity;
pub mod ordering;

pub use config::{EngineConfig, ReorderPolicy};
pub use entities::{
    Container, InsertOutcome, Item, ItemAttributes, NewContainer, RankAssignment,
};
pub use error::{
    ConfigError, RankError, RanklistError, RanklistResult, StorageError, ValidationError,
};
pub use identity::{ContainerId, EntityIdType, ItemId, OwnerId, Rank, Timestamp};
pub use ordering::{audit_ranks, clamp_requested_rank, ensure_dense, next_tail_rank, RankAudit};
