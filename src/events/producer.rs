use std::sync::Arc;

use async_trait::async_trait;

use super::channel::MessageBroker;
use super::InconsistentEvent;
use crate::core::Result;

/// Producer boundary of the event channel.
///
/// The validator only ever talks to this trait; swapping the in-process
/// broker for a real message bus is a one-impl change.
#[async_trait]
pub trait EventProducer: Send + Sync {
    async fn publish(&self, event: InconsistentEvent) -> Result<()>;
}

/// Publishes inconsistency events to one broker topic as JSON payloads.
pub struct TopicProducer {
    broker: Arc<MessageBroker>,
    topic: String,
}

impl TopicProducer {
    pub fn new(broker: Arc<MessageBroker>, topic: impl Into<String>) -> Self {
        Self {
            broker,
            topic: topic.into(),
        }
    }
}

#[async_trait]
impl EventProducer for TopicProducer {
    async fn publish(&self, event: InconsistentEvent) -> Result<()> {
        let payload = serde_json::to_vec(&event)?;
        self.broker.publish(&self.topic, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Direction, InconsistencyKind};

    #[tokio::test]
    async fn test_published_event_round_trips_through_topic() {
        let broker = Arc::new(MessageBroker::new());
        let producer = TopicProducer::new(broker.clone(), "inconsistency");
        let sub = broker.subscribe("inconsistency").unwrap();

        let event = InconsistentEvent {
            id: 42,
            kind: InconsistencyKind::Neq,
            direction: Direction::DstToSrc,
        };
        producer.publish(event).await.unwrap();

        let delivery = sub.next().await.unwrap();
        let back: InconsistentEvent = serde_json::from_slice(delivery.payload()).unwrap();
        assert_eq!(back, event);
        delivery.ack();
    }
}
