use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::EntityStore;
use crate::core::{Entity, Result};

/// In-memory reference store.
///
/// Rows live in a `BTreeMap` keyed by identity, which gives primary-key
/// paging for free. All operations take the shared lock; the repair batch
/// holds the write lock for its whole span, which is what makes it
/// all-or-nothing.
pub struct InMemoryStore<E: Entity> {
    rows: RwLock<BTreeMap<i64, E>>,
}

impl<E: Entity> InMemoryStore<E> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of rows currently stored.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Copy of every row in primary-key order.
    pub async fn snapshot(&self) -> Vec<E> {
        self.rows.read().await.values().cloned().collect()
    }
}

impl<E: Entity> Default for InMemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: Entity> EntityStore<E> for InMemoryStore<E> {
    async fn get(&self, id: i64) -> Result<Option<E>> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn get_many(&self, ids: &[i64]) -> Result<Vec<E>> {
        let rows = self.rows.read().await;
        Ok(ids.iter().filter_map(|id| rows.get(id).cloned()).collect())
    }

    async fn upsert(&self, entity: &E) -> Result<()> {
        self.rows.write().await.insert(entity.id(), entity.clone());
        Ok(())
    }

    async fn upsert_many(&self, entities: &[E]) -> Result<()> {
        let mut rows = self.rows.write().await;
        for entity in entities {
            rows.insert(entity.id(), entity.clone());
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.rows.write().await.remove(&id);
        Ok(())
    }

    async fn delete_many(&self, ids: &[i64]) -> Result<()> {
        let mut rows = self.rows.write().await;
        for id in ids {
            rows.remove(id);
        }
        Ok(())
    }

    async fn page_by_id(&self, offset: usize, limit: usize) -> Result<Vec<E>> {
        let rows = self.rows.read().await;
        Ok(rows.values().skip(offset).take(limit).cloned().collect())
    }

    async fn page_by_modified(&self, floor: i64, offset: usize, limit: usize) -> Result<Vec<E>> {
        let rows = self.rows.read().await;
        let mut changed: Vec<&E> = rows.values().filter(|e| e.modified_at() > floor).collect();
        changed.sort_by_key(|e| (e.modified_at(), e.id()));
        Ok(changed
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn page_ids(&self, offset: usize, limit: usize) -> Result<Vec<i64>> {
        let rows = self.rows.read().await;
        Ok(rows.keys().skip(offset).take(limit).copied().collect())
    }

    async fn apply_repair_batch(&self, deletes: &[i64], upserts: &[E]) -> Result<()> {
        let mut rows = self.rows.write().await;
        for id in deletes {
            rows.remove(id);
        }
        for entity in upserts {
            rows.insert(entity.id(), entity.clone());
        }
        Ok(())
    }
}
