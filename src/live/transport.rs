//! Push transport seam and an in-process hub implementing it

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Callback invoked when a message arrives on a subscribed topic
pub type MessageHandler = Arc<dyn Fn() + Send + Sync>;

/// Identifies one registration made through [`PushTransport::subscribe`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    id: u64,
    topic: String,
}

impl SubscriptionHandle {
    pub fn new(id: u64, topic: impl Into<String>) -> Self {
        Self {
            id,
            topic: topic.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

/// A server-push transport delivering "data changed" notifications per topic
///
/// Registration is synchronous. Delivery happens whenever the transport sees
/// fit, possibly from another task, and carries no ordering guarantee.
pub trait PushTransport: Send + Sync {
    fn subscribe(&self, topic: &str, on_message: MessageHandler) -> SubscriptionHandle;

    /// Remove a registration. Unknown or already removed handles are ignored.
    fn unsubscribe(&self, handle: &SubscriptionHandle);
}

/// In-process push hub
///
/// Useful wherever the producer of notifications lives in the same process,
/// and as the transport used by tests.
#[derive(Default)]
pub struct MemoryHub {
    subscribers: DashMap<String, Vec<(u64, MessageHandler)>>,
    next_id: AtomicU64,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a message to every handler subscribed to `topic`
    ///
    /// Returns how many handlers were notified.
    pub fn publish(&self, topic: &str) -> usize {
        // Clone the handlers out so no shard lock is held while they run
        let handlers: Vec<MessageHandler> = self
            .subscribers
            .get(topic)
            .map(|entry| entry.value().iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        for handler in &handlers {
            handler();
        }

        handlers.len()
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.subscribers
            .get(topic)
            .map(|entry| entry.value().len())
            .unwrap_or(0)
    }
}

impl PushTransport for MemoryHub {
    fn subscribe(&self, topic: &str, on_message: MessageHandler) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .entry(topic.to_string())
            .or_default()
            .push((id, on_message));

        debug!(topic, id, "Registered push subscriber");
        SubscriptionHandle::new(id, topic)
    }

    fn unsubscribe(&self, handle: &SubscriptionHandle) {
        if let Some(mut entry) = self.subscribers.get_mut(handle.topic()) {
            entry.value_mut().retain(|(id, _)| *id != handle.id());
        }
        self.subscribers
            .remove_if(handle.topic(), |_, handlers| handlers.is_empty());
    }
}
