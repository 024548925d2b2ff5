use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

/// Fire-and-forget, multi-topic publish/subscribe bus. No acknowledgement
/// semantics (spec §6): a publish with zero subscribers simply has no
/// effect.
pub trait NotificationBus: Send + Sync {
    /// Publishes `payload` on `topic` to any current subscribers.
    fn publish(&self, topic: &str, payload: Vec<u8>);

    /// Subscribes to `topic`, returning a stream of future payloads. Missed
    /// messages from before this call are never delivered.
    fn subscribe(&self, topic: &str) -> BroadcastStream<Vec<u8>>;
}

const CHANNEL_CAPACITY: usize = 256;

/// `tokio::sync::broadcast`-backed [`NotificationBus`], lazily allocating one
/// channel per topic on first use.
#[derive(Clone, Default)]
pub struct InMemoryBus {
    topics: Arc<RwLock<HashMap<String, broadcast::Sender<Vec<u8>>>>>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender_for(&self, topic: &str) -> broadcast::Sender<Vec<u8>> {
        if let Some(tx) = self.topics.read().get(topic) {
            return tx.clone();
        }
        let mut topics = self.topics.write();
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

impl NotificationBus for InMemoryBus {
    fn publish(&self, topic: &str, payload: Vec<u8>) {
        let tx = self.sender_for(topic);
        // No subscribers is not an error: fire-and-forget per spec §6.
        let _ = tx.send(payload);
    }

    fn subscribe(&self, topic: &str) -> BroadcastStream<Vec<u8>> {
        let tx = self.sender_for(topic);
        BroadcastStream::new(tx.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn subscriber_receives_published_message() {
        let bus = InMemoryBus::new();
        let mut rx = bus.subscribe("ledger.new-block");
        bus.publish("ledger.new-block", b"hello".to_vec());

        let received = rx.next().await.unwrap().unwrap();
        assert_eq!(received, b"hello");
    }

    #[tokio::test]
    async fn publish_without_subscribers_does_not_panic() {
        let bus = InMemoryBus::new();
        bus.publish("ledger.new-block", b"nobody listening".to_vec());
    }
}
