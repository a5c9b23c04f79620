use std::sync::Arc;
use std::time::Duration;

use log::{error, info};
use tokio::time::sleep;

use super::Fixer;
use crate::core::{Entity, Result, StopSignal};
use crate::events::{Direction, InconsistentEvent, Subscription};
use crate::store::EntityStore;

/// Event-driven repair loop.
///
/// Consumes inconsistency events from one topic subscription and repairs
/// each identity through the fixer matching the event's direction. An event
/// is acknowledged only after its repair succeeded; a failed repair drops
/// the delivery back onto the topic for redelivery, so repair is retried
/// until it lands, which is safe because repair is idempotent.
pub struct RepairConsumer<E: Entity> {
    forward: Fixer<E>,
    reverse: Fixer<E>,
    subscription: Subscription,
    retry_delay: Duration,
}

impl<E: Entity> RepairConsumer<E> {
    /// `src`/`dst` are the migration's source and target stores; the
    /// consumer builds both repair orientations from them and picks per
    /// event.
    pub fn new(
        src: Arc<dyn EntityStore<E>>,
        dst: Arc<dyn EntityStore<E>>,
        subscription: Subscription,
    ) -> Self {
        Self {
            forward: Fixer::new(src.clone(), dst.clone()),
            reverse: Fixer::new(dst, src),
            subscription,
            retry_delay: Duration::from_millis(100),
        }
    }

    /// Pause after a failed repair before taking the next delivery, so a
    /// persistently failing event cannot spin the loop hot. Defaults to
    /// 100 ms.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Consume until the topic closes or stop is requested.
    pub async fn run(self, mut stop: StopSignal) -> Result<()> {
        loop {
            let delivery = tokio::select! {
                delivery = self.subscription.next() => match delivery {
                    Some(delivery) => delivery,
                    None => {
                        info!("repair consumer: topic closed, shutting down");
                        return Ok(());
                    }
                },
                _ = stop.stopped() => return Ok(()),
            };

            let event: InconsistentEvent = match serde_json::from_slice(delivery.payload()) {
                Ok(event) => event,
                Err(err) => {
                    error!("repair consumer: dropping undecodable event: {}", err);
                    delivery.ack();
                    continue;
                }
            };

            let fixer = match event.direction {
                Direction::SrcToDst => &self.forward,
                Direction::DstToSrc => &self.reverse,
            };
            match fixer.fix_event(&event).await {
                Ok(()) => delivery.ack(),
                Err(err) => {
                    error!(
                        "repair consumer: repair of id {} ({}, {}) failed, event will be redelivered: {}",
                        event.id, event.kind, event.direction, err
                    );
                    drop(delivery);
                    tokio::select! {
                        _ = sleep(self.retry_delay) => {}
                        _ = stop.stopped() => return Ok(()),
                    }
                }
            }
        }
    }
}
