use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::models::entities::{Entity, EntityId, EntityKind};
use crate::models::errors::CommitError;
use crate::storage::EntityStore;

/// In-memory [`EntityStore`] with the same observable contract as the sqlite
/// backend, minus durability. Used by tests and by embedders that only need
/// the current run's view.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    entities: BTreeMap<EntityId, Entity>,
    last_processed_block: Option<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntityStore for MemoryStore {
    fn upsert(&self, entity: &Entity) -> Result<(), CommitError> {
        let mut inner = self.inner.lock().expect("memory store mutex poisoned");
        inner.entities.insert(entity.id().clone(), entity.clone());
        Ok(())
    }

    fn get(&self, id: &EntityId) -> Result<Option<Entity>, CommitError> {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        Ok(inner.entities.get(id).cloned())
    }

    fn scan_by_block_range(
        &self,
        kind: EntityKind,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Entity>, CommitError> {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        let mut matched: Vec<Entity> = inner
            .entities
            .values()
            .filter(|e| {
                e.kind() == kind
                    && e.meta().block_number >= from_block
                    && e.meta().block_number <= to_block
            })
            .cloned()
            .collect();
        matched.sort_by_key(|e| (e.meta().block_number, e.meta().log_index));
        Ok(matched)
    }

    fn last_processed_block(&self) -> Result<Option<u64>, CommitError> {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        Ok(inner.last_processed_block)
    }

    fn set_last_processed_block(&self, block: u64) -> Result<(), CommitError> {
        let mut inner = self.inner.lock().expect("memory store mutex poisoned");
        inner.last_processed_block = Some(block);
        Ok(())
    }
}
