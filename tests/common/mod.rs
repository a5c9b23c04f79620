#![allow(dead_code)]

/// Shared test fixtures for the migration engine suite.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use dualsync::{
    Entity, EntityStore, EventProducer, InMemoryStore, InconsistentEvent, Result, SyncError,
};

/// Minimal business record: an interaction counter with a housekeeping
/// timestamp that semantic equality ignores.
#[derive(Debug, Clone, PartialEq)]
pub struct Counter {
    pub id: i64,
    pub likes: i64,
    pub updated_at: i64,
}

impl Counter {
    pub fn new(id: i64, likes: i64) -> Self {
        Self {
            id,
            likes,
            updated_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn with_updated_at(id: i64, likes: i64, updated_at: i64) -> Self {
        Self {
            id,
            likes,
            updated_at,
        }
    }
}

impl Entity for Counter {
    fn id(&self) -> i64 {
        self.id
    }

    fn modified_at(&self) -> i64 {
        self.updated_at
    }

    fn content_eq(&self, other: &Self) -> bool {
        self.likes == other.likes
    }
}

/// An [`InMemoryStore`] with switchable failure injection: point reads
/// (`get`/`get_many`) and writes can be made to fail while paging keeps
/// working, so scans still terminate.
pub struct FlakyStore<E: Entity> {
    inner: InMemoryStore<E>,
    fail_gets: AtomicBool,
    fail_writes: AtomicBool,
}

impl<E: Entity> FlakyStore<E> {
    pub fn new() -> Self {
        Self {
            inner: InMemoryStore::new(),
            fail_gets: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_gets(&self, on: bool) {
        self.fail_gets.store(on, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, on: bool) {
        self.fail_writes.store(on, Ordering::SeqCst);
    }

    pub async fn seed(&self, rows: &[E]) {
        self.inner.upsert_many(rows).await.unwrap();
    }

    pub fn store(&self) -> &InMemoryStore<E> {
        &self.inner
    }

    fn read_gate(&self) -> Result<()> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(SyncError::Store("injected read failure".to_string()));
        }
        Ok(())
    }

    fn write_gate(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SyncError::Store("injected write failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl<E: Entity> EntityStore<E> for FlakyStore<E> {
    async fn get(&self, id: i64) -> Result<Option<E>> {
        self.read_gate()?;
        self.inner.get(id).await
    }

    async fn get_many(&self, ids: &[i64]) -> Result<Vec<E>> {
        self.read_gate()?;
        self.inner.get_many(ids).await
    }

    async fn upsert(&self, entity: &E) -> Result<()> {
        self.write_gate()?;
        self.inner.upsert(entity).await
    }

    async fn upsert_many(&self, entities: &[E]) -> Result<()> {
        self.write_gate()?;
        self.inner.upsert_many(entities).await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.write_gate()?;
        self.inner.delete(id).await
    }

    async fn delete_many(&self, ids: &[i64]) -> Result<()> {
        self.write_gate()?;
        self.inner.delete_many(ids).await
    }

    async fn page_by_id(&self, offset: usize, limit: usize) -> Result<Vec<E>> {
        self.inner.page_by_id(offset, limit).await
    }

    async fn page_by_modified(&self, floor: i64, offset: usize, limit: usize) -> Result<Vec<E>> {
        self.inner.page_by_modified(floor, offset, limit).await
    }

    async fn page_ids(&self, offset: usize, limit: usize) -> Result<Vec<i64>> {
        self.inner.page_ids(offset, limit).await
    }

    async fn apply_repair_batch(&self, deletes: &[i64], upserts: &[E]) -> Result<()> {
        self.write_gate()?;
        self.inner.apply_repair_batch(deletes, upserts).await
    }
}

/// Hand a [`FlakyStore`] out as the trait object the engine consumes.
pub fn as_store<E: Entity>(store: &Arc<FlakyStore<E>>) -> Arc<dyn EntityStore<E>> {
    store.clone()
}

/// Event producer that records everything it is asked to publish.
#[derive(Default)]
pub struct CollectingProducer {
    events: Mutex<Vec<InconsistentEvent>>,
}

impl CollectingProducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<InconsistentEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventProducer for CollectingProducer {
    async fn publish(&self, event: InconsistentEvent) -> Result<()> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}
