//! Identity types for ranklist entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Position of an item inside its container's live ordering.
///
/// Stored as a signed 32-bit value to line up with an SQL `INTEGER` column.
/// Live items always carry a rank `>= 1`.
pub type Rank = i32;

/// Common behavior of the strongly-typed identifiers.
pub trait EntityIdType: Copy + Eq + fmt::Display {
    /// Wrap an existing UUID.
    fn new(uuid: Uuid) -> Self;

    /// Generate a fresh timestamp-sortable identifier.
    fn now_v7() -> Self {
        Self::new(Uuid::now_v7())
    }

    /// Borrow the underlying UUID.
    fn as_uuid(&self) -> Uuid;
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl EntityIdType for $name {
            fn new(uuid: Uuid) -> Self {
                Self(uuid)
            }

            fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

entity_id!(
    /// Identifier of a ranking list.
    ContainerId
);

entity_id!(
    /// Identifier of a ranked entry.
    ItemId
);

entity_id!(
    /// Identifier of the user controlling a container.
    OwnerId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_distinct_and_sortable() {
        let a = ItemId::now_v7();
        let b = ItemId::now_v7();
        assert_ne!(a, b);
        assert!(a <= b);
    }

    #[test]
    fn test_id_display_matches_uuid() {
        let uuid = Uuid::nil();
        let id = ContainerId::new(uuid);
        assert_eq!(id.to_string(), uuid.to_string());
        assert_eq!(Uuid::from(id), uuid);
    }

    #[test]
    fn test_id_serializes_transparently() -> Result<(), serde_json::Error> {
        let id = OwnerId::new(Uuid::nil());
        let json = serde_json::to_string(&id)?;
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000000\"");
        let back: OwnerId = serde_json::from_str(&json)?;
        assert_eq!(back, id);
        Ok(())
    }
}
