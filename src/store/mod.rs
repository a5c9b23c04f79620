pub mod memory;

use async_trait::async_trait;

use crate::core::{Entity, Result};

pub use memory::InMemoryStore;

/// CRUD-capable accessor for one physical data store.
///
/// Both sides of a migration implement this identical trait, so the
/// dual-write router, the validator and the fixer stay store-agnostic. You
/// can use [`InMemoryStore`] for tests and embedded setups, or wrap a real
/// database client to implement this trait for production use.
///
/// The paging methods exist for the validator's scans and must be cheap to
/// call repeatedly; `page_by_id`/`page_ids` iterate in primary-key order,
/// `page_by_modified` in last-modified order restricted to rows strictly
/// newer than `floor`.
#[async_trait]
pub trait EntityStore<E: Entity>: Send + Sync {
    /// Fetch one row by identity.
    async fn get(&self, id: i64) -> Result<Option<E>>;

    /// Fetch many rows by identity; absent ids are silently skipped.
    async fn get_many(&self, ids: &[i64]) -> Result<Vec<E>>;

    /// Insert the row or overwrite every tracked column of an existing one.
    async fn upsert(&self, entity: &E) -> Result<()>;

    /// Batch form of [`EntityStore::upsert`].
    async fn upsert_many(&self, entities: &[E]) -> Result<()>;

    /// Remove the row. Deleting an absent id is not an error.
    async fn delete(&self, id: i64) -> Result<()>;

    /// Batch form of [`EntityStore::delete`].
    async fn delete_many(&self, ids: &[i64]) -> Result<()>;

    /// Page through all rows in primary-key order.
    async fn page_by_id(&self, offset: usize, limit: usize) -> Result<Vec<E>>;

    /// Page through rows with `modified_at > floor` in last-modified order.
    async fn page_by_modified(&self, floor: i64, offset: usize, limit: usize) -> Result<Vec<E>>;

    /// Page through identities only, in primary-key order.
    async fn page_ids(&self, offset: usize, limit: usize) -> Result<Vec<i64>>;

    /// Apply a repair batch atomically: all deletes and upserts commit
    /// together or not at all. Adapters backed by SQL stores are expected to
    /// run this inside one transaction, chunking the upserts as they see
    /// fit; the contract to callers is all-or-nothing.
    async fn apply_repair_batch(&self, deletes: &[i64], upserts: &[E]) -> Result<()>;
}
