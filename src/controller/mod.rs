use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{error, info};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::core::{stop_channel, Entity, Phase, PhaseCell, Result, StopHandle, SyncError};
use crate::events::{Direction, EventProducer, Subscription};
use crate::fixer::RepairConsumer;
use crate::router::DualWriteStore;
use crate::store::EntityStore;
use crate::validator::Validator;

/// Operator-facing control surface of one entity type's migration.
///
/// Owns the single authoritative [`Phase`] and the lifecycle of the
/// validation and repair workers. Any phase can be set from any phase: the
/// engine does not guard transition sequences, so skipping the dual-write
/// phases (e.g. `src_only` straight to `dst_only`) is possible and loses
/// the safety they provide; sequencing discipline stays with the operator.
pub struct MigrationController<E: Entity> {
    phase: Arc<PhaseCell>,
    src: Arc<dyn EntityStore<E>>,
    dst: Arc<dyn EntityStore<E>>,
    producer: Arc<dyn EventProducer>,
    batch_size: usize,
    sleep_interval: Duration,
    call_timeout: Duration,
    retry_delay: Duration,
    full_run: Mutex<Option<RunHandle>>,
    incr_run: Mutex<Option<RunHandle>>,
    repair_run: Mutex<Option<RunHandle>>,
}

impl<E: Entity> MigrationController<E> {
    /// Create a controller starting in [`Phase::SrcOnly`].
    pub fn new(
        src: Arc<dyn EntityStore<E>>,
        dst: Arc<dyn EntityStore<E>>,
        producer: Arc<dyn EventProducer>,
    ) -> Self {
        Self {
            phase: Arc::new(PhaseCell::new(Phase::SrcOnly)),
            src,
            dst,
            producer,
            batch_size: 100,
            sleep_interval: Duration::from_secs(1),
            call_timeout: Duration::from_secs(1),
            retry_delay: Duration::from_millis(100),
            full_run: Mutex::new(None),
            incr_run: Mutex::new(None),
            repair_run: Mutex::new(None),
        }
    }

    /// Page size handed to spawned validators.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Poll delay of the incremental (tailing) validator.
    pub fn sleep_interval(mut self, interval: Duration) -> Self {
        self.sleep_interval = interval;
        self
    }

    /// Per-store-call deadline handed to spawned validators.
    pub fn call_timeout(mut self, deadline: Duration) -> Self {
        self.call_timeout = deadline;
        self
    }

    /// Failed-repair pause handed to the repair consumer.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// The currently active phase.
    pub fn phase(&self) -> Result<Phase> {
        self.phase.load()
    }

    /// Swap the active phase. Takes effect on the next routed write; running
    /// validations are not restarted and keep their orientation.
    pub fn set_phase(&self, phase: Phase) {
        info!("migration phase set to {}", phase);
        self.phase.store(phase);
    }

    /// Swap the active phase by its wire name (`src_only`, `src_first`,
    /// `dst_first`, `dst_only`).
    pub fn set_phase_by_name(&self, name: &str) -> Result<()> {
        self.set_phase(name.parse()?);
        Ok(())
    }

    /// A dual-write router sharing this controller's phase cell. Hand this
    /// to business code in place of a direct store handle.
    pub fn router(&self) -> DualWriteStore<E> {
        DualWriteStore::new(self.src.clone(), self.dst.clone(), self.phase.clone())
    }

    /// Start a one-shot full validation run, replacing any previous full
    /// run. The scan is oriented by the current phase: the authoritative
    /// store is treated as base.
    pub async fn start_full_validation(&self) -> Result<()> {
        let mut slot = self.full_run.lock().await;
        if let Some(previous) = slot.take() {
            previous.stop().await?;
        }
        let validator = self.build_validator()?.full();
        let (stop, signal) = stop_channel();
        info!("starting full validation run");
        let task = tokio::spawn(async move { validator.validate(signal).await });
        *slot = Some(RunHandle::new(stop, task));
        Ok(())
    }

    /// Stop the full validation run, if one is active.
    pub async fn stop_full_validation(&self) -> Result<()> {
        match self.full_run.lock().await.take() {
            Some(run) => run.stop().await,
            None => Ok(()),
        }
    }

    /// Wait for the active full validation run to finish on its own.
    pub async fn join_full_validation(&self) -> Result<()> {
        match self.full_run.lock().await.take() {
            Some(run) => run.join().await,
            None => Ok(()),
        }
    }

    /// Start an incremental (tailing) validation run from the given
    /// watermark (epoch milliseconds), defaulting to now. Replaces any
    /// previous incremental run.
    pub async fn start_incremental_validation(&self, watermark: Option<i64>) -> Result<()> {
        let mut slot = self.incr_run.lock().await;
        if let Some(previous) = slot.take() {
            previous.stop().await?;
        }
        let floor = watermark.unwrap_or_else(|| Utc::now().timestamp_millis());
        let validator = self
            .build_validator()?
            .incremental(floor)
            .sleep_interval(self.sleep_interval);
        let (stop, signal) = stop_channel();
        info!("starting incremental validation run above watermark {}", floor);
        let task = tokio::spawn(async move { validator.validate(signal).await });
        *slot = Some(RunHandle::new(stop, task));
        Ok(())
    }

    /// Stop the incremental validation run, if one is active.
    pub async fn stop_incremental_validation(&self) -> Result<()> {
        match self.incr_run.lock().await.take() {
            Some(run) => run.stop().await,
            None => Ok(()),
        }
    }

    /// Start the repair consumer on the given topic subscription, replacing
    /// any previous consumer.
    pub async fn start_repair(&self, subscription: Subscription) -> Result<()> {
        let mut slot = self.repair_run.lock().await;
        if let Some(previous) = slot.take() {
            previous.stop().await?;
        }
        let consumer = RepairConsumer::new(self.src.clone(), self.dst.clone(), subscription)
            .retry_delay(self.retry_delay);
        let (stop, signal) = stop_channel();
        info!("starting repair consumer");
        let task = tokio::spawn(consumer.run(signal));
        *slot = Some(RunHandle::new(stop, task));
        Ok(())
    }

    /// Stop the repair consumer, if one is active.
    pub async fn stop_repair(&self) -> Result<()> {
        match self.repair_run.lock().await.take() {
            Some(run) => run.stop().await,
            None => Ok(()),
        }
    }

    /// Stop every running worker. Errors are logged and the remaining
    /// workers are still stopped.
    pub async fn shutdown(&self) {
        for (name, result) in [
            ("full validation", self.stop_full_validation().await),
            ("incremental validation", self.stop_incremental_validation().await),
            ("repair consumer", self.stop_repair().await),
        ] {
            if let Err(err) = result {
                error!("shutdown: stopping {} failed: {}", name, err);
            }
        }
    }

    fn build_validator(&self) -> Result<Validator<E>> {
        let (base, target, direction) = match self.phase.load()? {
            Phase::SrcOnly | Phase::SrcFirst => {
                (self.src.clone(), self.dst.clone(), Direction::SrcToDst)
            }
            Phase::DstFirst | Phase::DstOnly => {
                (self.dst.clone(), self.src.clone(), Direction::DstToSrc)
            }
        };
        Ok(Validator::new(base, target, self.producer.clone(), direction)
            .batch_size(self.batch_size)
            .call_timeout(self.call_timeout))
    }
}

/// A spawned validation or repair worker: a stop handle plus its join
/// handle. Stopped gracefully on request; aborted if dropped while still
/// running.
struct RunHandle {
    stop: Option<StopHandle>,
    task: Option<JoinHandle<Result<()>>>,
}

impl RunHandle {
    fn new(stop: StopHandle, task: JoinHandle<Result<()>>) -> Self {
        Self {
            stop: Some(stop),
            task: Some(task),
        }
    }

    /// Signal stop and wait for the worker to unwind. A cancellation
    /// unwind counts as a clean stop.
    async fn stop(mut self) -> Result<()> {
        if let Some(stop) = self.stop.take() {
            stop.stop();
        }
        self.join().await
    }

    /// Wait for the worker without signalling it.
    async fn join(mut self) -> Result<()> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        match task.await {
            Ok(Ok(())) | Ok(Err(SyncError::Cancelled)) => Ok(()),
            Ok(Err(err)) => Err(err),
            Err(err) => Err(SyncError::Execution(format!("worker task join: {}", err))),
        }
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop.stop();
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
