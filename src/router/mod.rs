use std::sync::Arc;

use async_trait::async_trait;
use log::error;

use crate::core::{Entity, Phase, PhaseCell, Result};
use crate::store::EntityStore;

/// Dual-write router over a source and a target store.
///
/// Implements [`EntityStore`] itself, so business code keeps writing through
/// one handle while the active [`Phase`] decides which physical stores see
/// the write:
///
/// - `src_only` / `dst_only`: only the named store is written.
/// - `src_first`: source must succeed; target is written best-effort and a
///   target failure is logged, never propagated.
/// - `dst_first`: the mirror image.
///
/// Reads always go to the store the phase marks authoritative, never to
/// both. The phase cell is loaded once per call; an unknown raw tag fails
/// the call before either store is touched.
///
/// Batch writes follow the same per-store branching, not a transaction
/// spanning both stores. Each store stays consistent within itself; closing
/// the cross-store gap is the validator's and fixer's job.
#[derive(Clone)]
pub struct DualWriteStore<E: Entity> {
    src: Arc<dyn EntityStore<E>>,
    dst: Arc<dyn EntityStore<E>>,
    phase: Arc<PhaseCell>,
}

impl<E: Entity> DualWriteStore<E> {
    pub fn new(
        src: Arc<dyn EntityStore<E>>,
        dst: Arc<dyn EntityStore<E>>,
        phase: Arc<PhaseCell>,
    ) -> Self {
        Self { src, dst, phase }
    }

    fn authoritative(&self) -> Result<&Arc<dyn EntityStore<E>>> {
        match self.phase.load()? {
            Phase::SrcOnly | Phase::SrcFirst => Ok(&self.src),
            Phase::DstFirst | Phase::DstOnly => Ok(&self.dst),
        }
    }
}

#[async_trait]
impl<E: Entity> EntityStore<E> for DualWriteStore<E> {
    async fn get(&self, id: i64) -> Result<Option<E>> {
        self.authoritative()?.get(id).await
    }

    async fn get_many(&self, ids: &[i64]) -> Result<Vec<E>> {
        self.authoritative()?.get_many(ids).await
    }

    async fn upsert(&self, entity: &E) -> Result<()> {
        match self.phase.load()? {
            Phase::SrcOnly => self.src.upsert(entity).await,
            Phase::SrcFirst => {
                self.src.upsert(entity).await?;
                if let Err(err) = self.dst.upsert(entity).await {
                    error!("dual write: target upsert failed for id {}: {}", entity.id(), err);
                }
                Ok(())
            }
            Phase::DstFirst => {
                self.dst.upsert(entity).await?;
                if let Err(err) = self.src.upsert(entity).await {
                    error!("dual write: source upsert failed for id {}: {}", entity.id(), err);
                }
                Ok(())
            }
            Phase::DstOnly => self.dst.upsert(entity).await,
        }
    }

    async fn upsert_many(&self, entities: &[E]) -> Result<()> {
        match self.phase.load()? {
            Phase::SrcOnly => self.src.upsert_many(entities).await,
            Phase::SrcFirst => {
                self.src.upsert_many(entities).await?;
                if let Err(err) = self.dst.upsert_many(entities).await {
                    error!(
                        "dual write: target batch upsert of {} rows failed: {}",
                        entities.len(),
                        err
                    );
                }
                Ok(())
            }
            Phase::DstFirst => {
                self.dst.upsert_many(entities).await?;
                if let Err(err) = self.src.upsert_many(entities).await {
                    error!(
                        "dual write: source batch upsert of {} rows failed: {}",
                        entities.len(),
                        err
                    );
                }
                Ok(())
            }
            Phase::DstOnly => self.dst.upsert_many(entities).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.phase.load()? {
            Phase::SrcOnly => self.src.delete(id).await,
            Phase::SrcFirst => {
                self.src.delete(id).await?;
                if let Err(err) = self.dst.delete(id).await {
                    error!("dual write: target delete failed for id {}: {}", id, err);
                }
                Ok(())
            }
            Phase::DstFirst => {
                self.dst.delete(id).await?;
                if let Err(err) = self.src.delete(id).await {
                    error!("dual write: source delete failed for id {}: {}", id, err);
                }
                Ok(())
            }
            Phase::DstOnly => self.dst.delete(id).await,
        }
    }

    async fn delete_many(&self, ids: &[i64]) -> Result<()> {
        match self.phase.load()? {
            Phase::SrcOnly => self.src.delete_many(ids).await,
            Phase::SrcFirst => {
                self.src.delete_many(ids).await?;
                if let Err(err) = self.dst.delete_many(ids).await {
                    error!(
                        "dual write: target batch delete of {} ids failed: {}",
                        ids.len(),
                        err
                    );
                }
                Ok(())
            }
            Phase::DstFirst => {
                self.dst.delete_many(ids).await?;
                if let Err(err) = self.src.delete_many(ids).await {
                    error!(
                        "dual write: source batch delete of {} ids failed: {}",
                        ids.len(),
                        err
                    );
                }
                Ok(())
            }
            Phase::DstOnly => self.dst.delete_many(ids).await,
        }
    }

    async fn page_by_id(&self, offset: usize, limit: usize) -> Result<Vec<E>> {
        self.authoritative()?.page_by_id(offset, limit).await
    }

    async fn page_by_modified(&self, floor: i64, offset: usize, limit: usize) -> Result<Vec<E>> {
        self.authoritative()?
            .page_by_modified(floor, offset, limit)
            .await
    }

    async fn page_ids(&self, offset: usize, limit: usize) -> Result<Vec<i64>> {
        self.authoritative()?.page_ids(offset, limit).await
    }

    async fn apply_repair_batch(&self, deletes: &[i64], upserts: &[E]) -> Result<()> {
        match self.phase.load()? {
            Phase::SrcOnly => self.src.apply_repair_batch(deletes, upserts).await,
            Phase::SrcFirst => {
                self.src.apply_repair_batch(deletes, upserts).await?;
                if let Err(err) = self.dst.apply_repair_batch(deletes, upserts).await {
                    error!("dual write: target repair batch failed: {}", err);
                }
                Ok(())
            }
            Phase::DstFirst => {
                self.dst.apply_repair_batch(deletes, upserts).await?;
                if let Err(err) = self.src.apply_repair_batch(deletes, upserts).await {
                    error!("dual write: source repair batch failed: {}", err);
                }
                Ok(())
            }
            Phase::DstOnly => self.dst.apply_repair_batch(deletes, upserts).await,
        }
    }
}
