pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::models::entities::{Entity, EntityId, EntityKind};
use crate::models::errors::CommitError;

/// Keyed entity store plus the ingestion cursor.
///
/// `upsert` is idempotent by construction: entity ids are a pure function of
/// the originating log, so rewriting the same log overwrites in place. The
/// cursor methods are for the ingestion driver only; external consumers read
/// through `get` and `scan_by_block_range`.
pub trait EntityStore {
    fn upsert(&self, entity: &Entity) -> Result<(), CommitError>;

    fn get(&self, id: &EntityId) -> Result<Option<Entity>, CommitError>;

    /// Entities of one kind within `[from_block, to_block]`, ordered by
    /// `(block_number, log_index)` ascending. Every call re-reads committed
    /// state; an empty range is an empty vec, not an error.
    fn scan_by_block_range(
        &self,
        kind: EntityKind,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Entity>, CommitError>;

    fn last_processed_block(&self) -> Result<Option<u64>, CommitError>;

    fn set_last_processed_block(&self, block: u64) -> Result<(), CommitError>;
}

impl<T: EntityStore> EntityStore for std::sync::Arc<T> {
    fn upsert(&self, entity: &Entity) -> Result<(), CommitError> {
        (**self).upsert(entity)
    }

    fn get(&self, id: &EntityId) -> Result<Option<Entity>, CommitError> {
        (**self).get(id)
    }

    fn scan_by_block_range(
        &self,
        kind: EntityKind,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Entity>, CommitError> {
        (**self).scan_by_block_range(kind, from_block, to_block)
    }

    fn last_processed_block(&self) -> Result<Option<u64>, CommitError> {
        (**self).last_processed_block()
    }

    fn set_last_processed_block(&self, block: u64) -> Result<(), CommitError> {
        (**self).set_last_processed_block(block)
    }
}
