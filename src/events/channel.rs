use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::core::{Result, SyncError};

/// In-process topic broker with at-least-once delivery.
///
/// Each topic is a single queue shared by competing subscribers, so
/// subscriptions behave like members of one consumer group. A [`Delivery`]
/// must be acknowledged explicitly; dropping it un-acked requeues the
/// payload at the back of the topic. Redelivered messages therefore arrive
/// out of their original order, which consumers must tolerate anyway.
pub struct MessageBroker {
    topics: Mutex<HashMap<String, TopicHandle>>,
}

#[derive(Clone)]
struct TopicHandle {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
}

impl MessageBroker {
    pub fn new() -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
        }
    }

    fn topic(&self, name: &str) -> Result<TopicHandle> {
        let mut topics = self.topics.lock()?;
        if let Some(handle) = topics.get(name) {
            return Ok(handle.clone());
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = TopicHandle {
            tx,
            rx: Arc::new(tokio::sync::Mutex::new(rx)),
        };
        topics.insert(name.to_string(), handle.clone());
        Ok(handle)
    }

    /// Enqueue a payload on the named topic, creating it on first use.
    pub fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        let handle = self.topic(topic)?;
        handle
            .tx
            .send(payload)
            .map_err(|_| SyncError::Channel(format!("topic '{topic}' is closed")))
    }

    /// Join the named topic's consumer group.
    pub fn subscribe(&self, topic: &str) -> Result<Subscription> {
        let handle = self.topic(topic)?;
        Ok(Subscription {
            tx: handle.tx,
            rx: handle.rx,
        })
    }
}

impl Default for MessageBroker {
    fn default() -> Self {
        Self::new()
    }
}

/// One consumer-group member of a topic.
pub struct Subscription {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
}

impl Subscription {
    /// Wait for the next delivery. Returns `None` once the topic is closed
    /// and drained.
    pub async fn next(&self) -> Option<Delivery> {
        let payload = self.rx.lock().await.recv().await?;
        Some(Delivery {
            payload: Some(payload),
            tx: self.tx.clone(),
        })
    }
}

/// A message leased to one subscriber.
///
/// Call [`Delivery::ack`] after the message has been fully handled; dropping
/// the delivery instead returns the payload to the topic for redelivery.
pub struct Delivery {
    payload: Option<Vec<u8>>,
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl Delivery {
    pub fn payload(&self) -> &[u8] {
        self.payload.as_deref().unwrap_or(&[])
    }

    /// Acknowledge the message, consuming the lease.
    pub fn ack(mut self) {
        self.payload = None;
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        if let Some(payload) = self.payload.take() {
            let _ = self.tx.send(payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_acked_message_is_not_redelivered() {
        let broker = MessageBroker::new();
        let sub = broker.subscribe("t").unwrap();
        broker.publish("t", b"one".to_vec()).unwrap();

        let delivery = sub.next().await.unwrap();
        assert_eq!(delivery.payload(), b"one");
        delivery.ack();

        broker.publish("t", b"two".to_vec()).unwrap();
        let delivery = sub.next().await.unwrap();
        assert_eq!(delivery.payload(), b"two");
        delivery.ack();
    }

    #[tokio::test]
    async fn test_dropped_delivery_is_requeued() {
        let broker = MessageBroker::new();
        let sub = broker.subscribe("t").unwrap();
        broker.publish("t", b"sticky".to_vec()).unwrap();

        let delivery = sub.next().await.unwrap();
        drop(delivery);

        let delivery = sub.next().await.unwrap();
        assert_eq!(delivery.payload(), b"sticky");
        delivery.ack();
    }

    #[tokio::test]
    async fn test_subscribers_compete_for_messages() {
        let broker = MessageBroker::new();
        let first = broker.subscribe("t").unwrap();
        let second = broker.subscribe("t").unwrap();
        broker.publish("t", b"a".to_vec()).unwrap();
        broker.publish("t", b"b".to_vec()).unwrap();

        let one = first.next().await.unwrap();
        let two = second.next().await.unwrap();
        let mut seen = vec![one.payload().to_vec(), two.payload().to_vec()];
        seen.sort();
        assert_eq!(seen, vec![b"a".to_vec(), b"b".to_vec()]);
        one.ack();
        two.ack();
    }
}
