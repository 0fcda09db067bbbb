//! Entity records shared by the engine and every store implementation.

use crate::{
    ContainerId, EntityIdType, ItemId, OwnerId, Rank, RanklistResult, Timestamp, ValidationError,
};
use serde::{Deserialize, Serialize};

const TITLE_MAX: usize = 200;
const DESCRIPTION_MAX: usize = 1000;
const NOTES_MAX: usize = 2000;
const EXTERNAL_ID_MAX: usize = 100;
const EXTERNAL_TYPE_MAX: usize = 50;
const CONTAINER_NAME_MAX: usize = 100;
const IMAGE_URL_MAX: usize = 2048;

// ============================================================================
// CONTAINER
// ============================================================================

/// A capacity-bounded, owned ranking list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub container_id: ContainerId,
    pub owner_id: OwnerId,
    pub name: String,
    pub is_private: bool,
    /// Upper bound on the number of live items.
    pub max_items: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Container {
    /// Build a container record for `owner` from a validated request.
    pub fn new(owner_id: OwnerId, name: impl Into<String>, is_private: bool, max_items: i32) -> Self {
        let now = chrono::Utc::now();
        Self {
            container_id: ContainerId::now_v7(),
            owner_id,
            name: name.into(),
            is_private,
            max_items,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, owner_id: OwnerId) -> bool {
        self.owner_id == owner_id
    }
}

/// Request payload for creating a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContainer {
    pub name: String,
    pub is_private: bool,
    /// Falls back to the configured default when absent.
    pub max_items: Option<i32>,
}

impl NewContainer {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_max_items(mut self, max_items: i32) -> Self {
        self.max_items = Some(max_items);
        self
    }

    pub fn private(mut self) -> Self {
        self.is_private = true;
        self
    }

    /// Check the name bounds. Capacity bounds depend on configuration and are
    /// checked by the engine.
    pub fn validate(&self) -> RanklistResult<()> {
        require_text("name", &self.name, CONTAINER_NAME_MAX)
    }
}

// ============================================================================
// ITEM
// ============================================================================

/// Descriptive attributes of an item. Opaque to ranking logic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAttributes {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub external_id: Option<String>,
    pub external_type: Option<String>,
    pub notes: Option<String>,
    pub is_private: bool,
}

impl ItemAttributes {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_external(mut self, external_id: impl Into<String>, external_type: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self.external_type = Some(external_type.into());
        self
    }

    pub fn private(mut self) -> Self {
        self.is_private = true;
        self
    }

    /// Validate field lengths and the image URL.
    pub fn validate(&self) -> RanklistResult<()> {
        require_text("title", &self.title, TITLE_MAX)?;
        optional_text("description", self.description.as_deref(), DESCRIPTION_MAX)?;
        optional_url("image_url", self.image_url.as_deref(), IMAGE_URL_MAX)?;
        optional_text("notes", self.notes.as_deref(), NOTES_MAX)?;
        optional_text("external_id", self.external_id.as_deref(), EXTERNAL_ID_MAX)?;
        optional_text("external_type", self.external_type.as_deref(), EXTERNAL_TYPE_MAX)?;
        Ok(())
    }
}

/// One ranked entry inside a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub item_id: ItemId,
    pub container_id: ContainerId,
    /// Live position, or the frozen pre-deletion position once tombstoned.
    pub rank: Rank,
    /// `None` means live.
    pub tombstoned_at: Option<Timestamp>,
    pub attributes: ItemAttributes,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Item {
    pub fn new(container_id: ContainerId, rank: Rank, attributes: ItemAttributes) -> Self {
        let now = chrono::Utc::now();
        Self {
            item_id: ItemId::now_v7(),
            container_id,
            rank,
            tombstoned_at: None,
            attributes,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_live(&self) -> bool {
        self.tombstoned_at.is_none()
    }

    pub fn is_tombstoned(&self) -> bool {
        self.tombstoned_at.is_some()
    }
}

/// A single `(item, new rank)` pair of a bulk reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RankAssignment {
    pub item_id: ItemId,
    pub rank: Rank,
}

impl RankAssignment {
    pub fn new(item_id: ItemId, rank: Rank) -> Self {
        Self { item_id, rank }
    }
}

/// Result of a successful insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertOutcome {
    pub item_id: ItemId,
    pub rank: Rank,
}

fn require_text(field: &str, value: &str, max: usize) -> RanklistResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::RequiredFieldMissing {
            field: field.to_string(),
        }
        .into());
    }
    optional_text(field, Some(value), max)
}

fn optional_text(field: &str, value: Option<&str>, max: usize) -> RanklistResult<()> {
    match value {
        Some(text) if text.chars().count() > max => Err(ValidationError::InvalidValue {
            field: field.to_string(),
            reason: format!("must be at most {} characters", max),
        }
        .into()),
        _ => Ok(()),
    }
}

fn optional_url(field: &str, value: Option<&str>, max: usize) -> RanklistResult<()> {
    optional_text(field, value, max)?;
    match value.map(url::Url::parse) {
        Some(Err(err)) => Err(ValidationError::InvalidValue {
            field: field.to_string(),
            reason: format!("not a valid URL: {}", err),
        }
        .into()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RanklistError;

    #[test]
    fn test_item_attributes_require_title() {
        let err = ItemAttributes::titled("   ").validate().unwrap_err();
        assert!(matches!(
            err,
            RanklistError::Validation(ValidationError::RequiredFieldMissing { ref field }) if field == "title"
        ));
    }

    #[test]
    fn test_item_attributes_length_bounds() {
        assert!(ItemAttributes::titled("a".repeat(200)).validate().is_ok());
        assert!(ItemAttributes::titled("a".repeat(201)).validate().is_err());

        let notes = ItemAttributes::titled("ok").with_notes("n".repeat(2001));
        assert!(notes.validate().is_err());

        let external = ItemAttributes::titled("ok").with_external("x".repeat(100), "t".repeat(51));
        assert!(external.validate().is_err());
    }

    #[test]
    fn test_item_attributes_image_url_must_parse() {
        let ok = ItemAttributes::titled("Alien")
            .with_description("Nostromo crew meets a stowaway")
            .with_image_url("https://img.example.com/alien.jpg");
        assert!(ok.validate().is_ok());

        let err = ItemAttributes::titled("Alien")
            .with_image_url("not a url")
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            RanklistError::Validation(ValidationError::InvalidValue { ref field, .. }) if field == "image_url"
        ));

        let long = format!("https://img.example.com/{}", "a".repeat(2048));
        assert!(ItemAttributes::titled("Alien").with_image_url(long).validate().is_err());
    }

    #[test]
    fn test_new_container_name_bounds() {
        assert!(NewContainer::named("Top films").validate().is_ok());
        assert!(NewContainer::named("").validate().is_err());
        assert!(NewContainer::named("x".repeat(101)).validate().is_err());
    }

    #[test]
    fn test_new_item_is_live() {
        let item = Item::new(ContainerId::now_v7(), 1, ItemAttributes::titled("Alien"));
        assert!(item.is_live());
        assert!(!item.is_tombstoned());
    }

    #[test]
    fn test_container_ownership() {
        let owner = OwnerId::now_v7();
        let container = Container::new(owner, "Albums", false, 10);
        assert!(container.is_owned_by(owner));
        assert!(!container.is_owned_by(OwnerId::now_v7()));
    }
}
