pub mod consumer;

use std::collections::HashSet;
use std::sync::Arc;

use crate::core::{Entity, Result};
use crate::events::InconsistentEvent;
use crate::store::EntityStore;

pub use consumer::RepairConsumer;

/// Converges the target store toward the base store.
///
/// Base is ground truth for the duration of a migration: the fixer never
/// writes to it. Every repair is a pure function of an identity and base's
/// current state, so replaying the same event (at-least-once delivery)
/// re-applies the same upsert or delete and lands in the same end state.
pub struct Fixer<E: Entity> {
    base: Arc<dyn EntityStore<E>>,
    target: Arc<dyn EntityStore<E>>,
}

impl<E: Entity> Fixer<E> {
    pub fn new(base: Arc<dyn EntityStore<E>>, target: Arc<dyn EntityStore<E>>) -> Self {
        Self { base, target }
    }

    /// Repair one identity: overwrite the target row with base's current
    /// state, or delete it from target if base no longer has it.
    pub async fn fix(&self, id: i64) -> Result<()> {
        match self.base.get(id).await? {
            Some(row) => self.target.upsert(&row).await,
            None => self.target.delete(id).await,
        }
    }

    /// Repair the identity named by an event.
    ///
    /// The event's kind is diagnostic only; the action is re-derived from
    /// base's current state, so stale or replayed events stay harmless.
    pub async fn fix_event(&self, event: &InconsistentEvent) -> Result<()> {
        self.fix(event.id).await
    }

    /// Repair a set of identities in one transactional pass against the
    /// target: ids absent from base are deleted, found rows are overridden,
    /// and the whole batch commits atomically or not at all.
    pub async fn fix_batch(&self, ids: &[i64]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let found = self.base.get_many(ids).await?;
        let present: HashSet<i64> = found.iter().map(Entity::id).collect();
        let deletes: Vec<i64> = ids
            .iter()
            .copied()
            .filter(|id| !present.contains(id))
            .collect();
        self.target.apply_repair_batch(&deletes, &found).await
    }
}
