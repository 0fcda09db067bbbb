//! Table definitions and statements.
//!
//! Live-rank predicates always read `tombstoned_at IS NULL`; tombstoned rows
//! keep their frozen rank and never take part in a shift.

/// Idempotent schema bootstrap.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS ranklist_containers (
    container_id  UUID PRIMARY KEY,
    owner_id      UUID NOT NULL,
    name          TEXT NOT NULL,
    is_private    BOOLEAN NOT NULL DEFAULT FALSE,
    max_items     INTEGER NOT NULL CHECK (max_items >= 1),
    created_at    TIMESTAMPTZ NOT NULL,
    updated_at    TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS ranklist_containers_owner_idx
    ON ranklist_containers (owner_id);

CREATE TABLE IF NOT EXISTS ranklist_items (
    item_id        UUID PRIMARY KEY,
    container_id   UUID NOT NULL REFERENCES ranklist_containers (container_id) ON DELETE CASCADE,
    rank           INTEGER NOT NULL,
    tombstoned_at  TIMESTAMPTZ,
    title          TEXT NOT NULL,
    description    TEXT,
    image_url      TEXT,
    external_id    TEXT,
    external_type  TEXT,
    notes          TEXT,
    is_private     BOOLEAN NOT NULL DEFAULT FALSE,
    created_at     TIMESTAMPTZ NOT NULL,
    updated_at     TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS ranklist_items_live_rank_idx
    ON ranklist_items (container_id, rank)
    WHERE tombstoned_at IS NULL;

CREATE INDEX IF NOT EXISTS ranklist_items_tombstoned_idx
    ON ranklist_items (container_id, tombstoned_at DESC)
    WHERE tombstoned_at IS NOT NULL;
"#;

macro_rules! container_columns {
    () => {
        "container_id, owner_id, name, is_private, max_items, created_at, updated_at"
    };
}

macro_rules! item_columns {
    () => {
        "item_id, container_id, rank, tombstoned_at, title, description, image_url, \
         external_id, external_type, notes, is_private, created_at, updated_at"
    };
}

// === Container Statements ===

pub(crate) const CONTAINER_INSERT: &str = concat!(
    "INSERT INTO ranklist_containers (",
    container_columns!(),
    ") VALUES ($1, $2, $3, $4, $5, $6, $7)"
);

pub(crate) const CONTAINER_GET: &str = concat!(
    "SELECT ",
    container_columns!(),
    " FROM ranklist_containers WHERE container_id = $1"
);

pub(crate) const CONTAINER_LOCK: &str = concat!(
    "SELECT ",
    container_columns!(),
    " FROM ranklist_containers WHERE container_id = $1 FOR UPDATE"
);

pub(crate) const CONTAINER_SET_MAX_ITEMS: &str =
    "UPDATE ranklist_containers SET max_items = $2, updated_at = now() WHERE container_id = $1";

pub(crate) const CONTAINER_DELETE_ITEMS: &str =
    "DELETE FROM ranklist_items WHERE container_id = $1";

pub(crate) const CONTAINER_DELETE: &str =
    "DELETE FROM ranklist_containers WHERE container_id = $1";

// === Item Statements ===

pub(crate) const ITEM_GET: &str = concat!(
    "SELECT ",
    item_columns!(),
    " FROM ranklist_items WHERE item_id = $1"
);

pub(crate) const ITEM_LIVE: &str = concat!(
    "SELECT ",
    item_columns!(),
    " FROM ranklist_items WHERE container_id = $1 AND tombstoned_at IS NULL",
    " ORDER BY rank, created_at, item_id"
);

pub(crate) const ITEM_LIVE_COUNT: &str =
    "SELECT count(*) FROM ranklist_items WHERE container_id = $1 AND tombstoned_at IS NULL";

pub(crate) const ITEM_MAX_LIVE_RANK: &str =
    "SELECT max(rank) FROM ranklist_items WHERE container_id = $1 AND tombstoned_at IS NULL";

pub(crate) const ITEM_TOMBSTONED_FOR_OWNER: &str = "SELECT i.item_id, i.container_id, i.rank, \
     i.tombstoned_at, i.title, i.description, i.image_url, i.external_id, i.external_type, \
     i.notes, i.is_private, i.created_at, i.updated_at \
     FROM ranklist_items i \
     JOIN ranklist_containers c ON c.container_id = i.container_id \
     WHERE c.owner_id = $1 AND i.tombstoned_at IS NOT NULL \
     ORDER BY i.tombstoned_at DESC \
     LIMIT $2";

pub(crate) const ITEM_SHIFT_LIVE: &str = "UPDATE ranklist_items SET rank = rank + $3, updated_at = now() \
     WHERE container_id = $1 AND tombstoned_at IS NULL AND rank >= $2";

pub(crate) const ITEM_INSERT: &str = concat!(
    "INSERT INTO ranklist_items (",
    item_columns!(),
    ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
);

pub(crate) const ITEM_UPDATE_ATTRIBUTES: &str = "UPDATE ranklist_items SET title = $2, description = $3, \
     image_url = $4, external_id = $5, external_type = $6, notes = $7, is_private = $8, \
     updated_at = now() WHERE item_id = $1";

pub(crate) const ITEM_SET_RANK: &str =
    "UPDATE ranklist_items SET rank = $2, updated_at = now() WHERE item_id = $1";

pub(crate) const ITEM_TOMBSTONE: &str =
    "UPDATE ranklist_items SET tombstoned_at = $2, updated_at = $2 WHERE item_id = $1";

pub(crate) const ITEM_RESTORE: &str = "UPDATE ranklist_items SET tombstoned_at = NULL, rank = $2, updated_at = now() \
     WHERE item_id = $1";

pub(crate) const ITEM_DELETE: &str = "DELETE FROM ranklist_items WHERE item_id = $1";
