use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::error;
use tokio::time::{sleep, timeout};

use crate::core::{Entity, Result, StopSignal, SyncError};
use crate::events::{EventProducer, InconsistencyKind, InconsistentEvent};
use crate::store::EntityStore;
pub use crate::events::Direction;

/// Full scans walk every row; incremental scans tail rows whose
/// `modified_at` lies strictly above the configured watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Full,
    Incremental,
}

/// Detects divergence between a base and a target store without mutating
/// either, publishing one [`InconsistentEvent`] per detected mismatch.
///
/// [`Validator::validate`] runs two scan directions concurrently:
///
/// - base → target, row by row (or page by page with [`Validator::batched`]),
///   emitting `target_missing` / `neq`;
/// - target → base over identity pages, emitting `base_missing`.
///
/// Transient store errors are logged and the scan advances; only the stop
/// signal terminates a direction early. With a positive sleep interval an
/// exhausted scan suspends and re-polls instead of returning, which turns
/// the same algorithm into a continuous drift detector.
pub struct Validator<E: Entity> {
    base: Arc<dyn EntityStore<E>>,
    target: Arc<dyn EntityStore<E>>,
    producer: Arc<dyn EventProducer>,
    direction: Direction,
    mode: ScanMode,
    watermark: i64,
    batch_size: usize,
    sleep_interval: Duration,
    call_timeout: Duration,
    use_batch: bool,
}

impl<E: Entity> Validator<E> {
    pub fn new(
        base: Arc<dyn EntityStore<E>>,
        target: Arc<dyn EntityStore<E>>,
        producer: Arc<dyn EventProducer>,
        direction: Direction,
    ) -> Self {
        Self {
            base,
            target,
            producer,
            direction,
            mode: ScanMode::Full,
            watermark: 0,
            batch_size: 100,
            sleep_interval: Duration::ZERO,
            call_timeout: Duration::from_secs(1),
            use_batch: false,
        }
    }

    /// One-pass comparison of all rows (the default).
    pub fn full(mut self) -> Self {
        self.mode = ScanMode::Full;
        self
    }

    /// Watermark-driven comparison of rows modified after `watermark`
    /// (epoch milliseconds).
    pub fn incremental(mut self, watermark: i64) -> Self {
        self.mode = ScanMode::Incremental;
        self.watermark = watermark;
        self
    }

    /// Page size for bulk lookups. Defaults to 100.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// How long an exhausted scan sleeps before re-polling. Zero (the
    /// default) makes exhaustion terminate the scan instead.
    pub fn sleep_interval(mut self, interval: Duration) -> Self {
        self.sleep_interval = interval;
        self
    }

    /// Deadline applied to every individual store call. Defaults to one
    /// second.
    pub fn call_timeout(mut self, deadline: Duration) -> Self {
        self.call_timeout = deadline;
        self
    }

    /// Switch the base → target direction from row-by-row lookups to paged
    /// set-difference comparison. Behaviorally equivalent; trades
    /// round-trips for lookup-table construction.
    pub fn batched(mut self) -> Self {
        self.use_batch = true;
        self
    }

    /// Run both scan directions to completion (full mode) or until stopped
    /// (tailing mode).
    ///
    /// The directions are independent failure domains: store trouble in one
    /// never stops the other. The only error either direction returns is
    /// [`SyncError::Cancelled`], so a stop request is also the only thing
    /// that aborts the sibling direction early.
    pub async fn validate(&self, stop: StopSignal) -> Result<()> {
        let base_to_target = async {
            if self.use_batch {
                self.base_to_target_batched(stop.clone()).await
            } else {
                self.base_to_target(stop.clone()).await
            }
        };
        let target_to_base = self.target_to_base(stop.clone());
        tokio::try_join!(base_to_target, target_to_base)?;
        Ok(())
    }

    async fn base_to_target(&self, mut stop: StopSignal) -> Result<()> {
        let mut offset = 0usize;
        loop {
            if stop.is_stopped() {
                return Err(SyncError::Cancelled);
            }
            let row = match self.fetch_base_row(offset).await {
                Ok(Some(row)) => row,
                Ok(None) => {
                    if !self.pause_or_finish(&mut stop).await? {
                        return Ok(());
                    }
                    continue;
                }
                Err(err) => {
                    error!("base->target: base read at offset {} failed: {}", offset, err);
                    offset += 1;
                    continue;
                }
            };

            match self.bounded(self.target.get(row.id())).await {
                Ok(Some(counterpart)) => {
                    if !row.content_eq(&counterpart) {
                        self.notify(row.id(), InconsistencyKind::Neq).await;
                    }
                }
                Ok(None) => {
                    self.notify(row.id(), InconsistencyKind::TargetMissing)
                        .await;
                }
                Err(err) => {
                    error!(
                        "base->target: target read for id {} failed: {}",
                        row.id(),
                        err
                    );
                }
            }
            offset += 1;
        }
    }

    async fn base_to_target_batched(&self, mut stop: StopSignal) -> Result<()> {
        let mut offset = 0usize;
        loop {
            if stop.is_stopped() {
                return Err(SyncError::Cancelled);
            }
            let page = match self.fetch_base_page(offset, self.batch_size).await {
                Ok(page) => page,
                Err(err) => {
                    error!(
                        "base->target: base page at offset {} failed: {}",
                        offset, err
                    );
                    offset += self.batch_size;
                    continue;
                }
            };
            if page.is_empty() {
                if !self.pause_or_finish(&mut stop).await? {
                    return Ok(());
                }
                continue;
            }

            let ids: Vec<i64> = page.iter().map(Entity::id).collect();
            match self.bounded(self.target.get_many(&ids)).await {
                Ok(found) => {
                    let by_id: HashMap<i64, E> =
                        found.into_iter().map(|e| (e.id(), e)).collect();
                    for row in &page {
                        match by_id.get(&row.id()) {
                            None => {
                                self.notify(row.id(), InconsistencyKind::TargetMissing)
                                    .await;
                            }
                            Some(counterpart) if !row.content_eq(counterpart) => {
                                self.notify(row.id(), InconsistencyKind::Neq).await;
                            }
                            Some(_) => {}
                        }
                    }
                }
                Err(err) => {
                    error!("base->target: target bulk read failed: {}", err);
                }
            }

            let fetched = page.len();
            if fetched < self.batch_size && !self.pause_or_finish(&mut stop).await? {
                return Ok(());
            }
            offset += fetched;
        }
    }

    async fn target_to_base(&self, mut stop: StopSignal) -> Result<()> {
        let mut offset = 0usize;
        loop {
            if stop.is_stopped() {
                return Err(SyncError::Cancelled);
            }
            let ids = match self.bounded(self.target.page_ids(offset, self.batch_size)).await {
                Ok(ids) => ids,
                Err(err) => {
                    error!(
                        "target->base: target id page at offset {} failed: {}",
                        offset, err
                    );
                    offset += self.batch_size;
                    continue;
                }
            };
            if ids.is_empty() {
                if !self.pause_or_finish(&mut stop).await? {
                    return Ok(());
                }
                continue;
            }

            match self.bounded(self.base.get_many(&ids)).await {
                Ok(found) => {
                    let present: HashSet<i64> = found.iter().map(Entity::id).collect();
                    for id in ids.iter().copied().filter(|id| !present.contains(id)) {
                        self.notify(id, InconsistencyKind::BaseMissing).await;
                    }
                }
                Err(err) => {
                    error!("target->base: base bulk read failed: {}", err);
                }
            }

            let fetched = ids.len();
            if fetched < self.batch_size && !self.pause_or_finish(&mut stop).await? {
                return Ok(());
            }
            offset += fetched;
        }
    }

    async fn fetch_base_row(&self, offset: usize) -> Result<Option<E>> {
        Ok(self.fetch_base_page(offset, 1).await?.into_iter().next())
    }

    async fn fetch_base_page(&self, offset: usize, limit: usize) -> Result<Vec<E>> {
        match self.mode {
            ScanMode::Full => self.bounded(self.base.page_by_id(offset, limit)).await,
            ScanMode::Incremental => {
                self.bounded(self.base.page_by_modified(self.watermark, offset, limit))
                    .await
            }
        }
    }

    /// Handles an exhausted scan: `Ok(false)` means finish, `Ok(true)` means
    /// the tailing sleep elapsed and the scan should re-poll.
    async fn pause_or_finish(&self, stop: &mut StopSignal) -> Result<bool> {
        if self.sleep_interval.is_zero() {
            return Ok(false);
        }
        tokio::select! {
            _ = sleep(self.sleep_interval) => Ok(true),
            _ = stop.stopped() => Err(SyncError::Cancelled),
        }
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        match timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout(self.call_timeout)),
        }
    }

    /// Publish one divergence notice. Publish failures are logged, never
    /// propagated: a broker hiccup must not kill a scan, and the next
    /// validation pass re-detects anything lost here.
    async fn notify(&self, id: i64, kind: InconsistencyKind) {
        let event = InconsistentEvent {
            id,
            kind,
            direction: self.direction,
        };
        match timeout(self.call_timeout, self.producer.publish(event)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => error!("publishing {} for id {} failed: {}", kind, id, err),
            Err(_) => error!("publishing {} for id {} timed out", kind, id),
        }
    }
}
