// ============================================================================
// dualsync: online data-migration and reconciliation engine
// ============================================================================

//! Move a business entity's system of record from one data store to another
//! without downtime: a phase-driven dual-write router keeps both stores fed
//! during the shift, a validator continuously detects divergence between
//! them, and an idempotent fixer repairs the target back toward the base.
//!
//! The engine is entity-agnostic: implement [`Entity`] for your record type
//! and [`EntityStore`] for your data stores, then drive the migration
//! through a [`MigrationController`].
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use dualsync::{
//!     Entity, EntityStore, InMemoryStore, MessageBroker, MigrationController, Phase,
//!     TopicProducer,
//! };
//!
//! #[derive(Clone)]
//! struct Counter {
//!     id: i64,
//!     value: i64,
//!     updated_at: i64,
//! }
//!
//! impl Entity for Counter {
//!     fn id(&self) -> i64 {
//!         self.id
//!     }
//!     fn modified_at(&self) -> i64 {
//!         self.updated_at
//!     }
//!     fn content_eq(&self, other: &Self) -> bool {
//!         self.value == other.value
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> dualsync::Result<()> {
//!     let src = Arc::new(InMemoryStore::<Counter>::new());
//!     let dst = Arc::new(InMemoryStore::<Counter>::new());
//!     let broker = Arc::new(MessageBroker::new());
//!     let producer = Arc::new(TopicProducer::new(broker.clone(), "inconsistency"));
//!
//!     let controller: MigrationController<Counter> = MigrationController::new(src, dst, producer);
//!     let router = controller.router();
//!
//!     // Business traffic writes through the router; the phase decides
//!     // which stores see it.
//!     controller.set_phase(Phase::SrcFirst);
//!     router
//!         .upsert(&Counter {
//!             id: 1,
//!             value: 3,
//!             updated_at: 0,
//!         })
//!         .await?;
//!
//!     // Reconcile: detect divergence, repair it from the event stream.
//!     controller.start_repair(broker.subscribe("inconsistency")?).await?;
//!     controller.start_full_validation().await?;
//!     controller.join_full_validation().await?;
//!     controller.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod controller;
pub mod core;
pub mod events;
pub mod fixer;
pub mod router;
pub mod store;
pub mod validator;

// Re-export main types for convenience
pub use controller::MigrationController;
pub use core::{
    stop_channel, Entity, Phase, PhaseCell, Result, StopHandle, StopSignal, SyncError,
};
pub use events::{
    Delivery, Direction, EventProducer, InconsistencyKind, InconsistentEvent, MessageBroker,
    Subscription, TopicProducer,
};
pub use fixer::{Fixer, RepairConsumer};
pub use router::DualWriteStore;
pub use store::{EntityStore, InMemoryStore};
pub use validator::{ScanMode, Validator};
