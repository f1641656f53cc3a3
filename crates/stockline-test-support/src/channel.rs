//! Test channels — in-memory `EventChannel` implementations for tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use stockline_core::channel::{
    Acknowledgement, EventChannel, MessageHandler, QueueBinding, dispatch, topic_matches,
};
use stockline_core::error::InventoryError;

/// A message captured by `InMemoryEventChannel::publish`.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    /// Target exchange.
    pub exchange: String,
    /// Routing key.
    pub routing_key: String,
    /// Message body.
    pub payload: serde_json::Value,
}

/// An event channel that records every publish and lets tests play the
/// broker: `deliver` routes a message to every consumer whose binding
/// matches, runs the handlers, and reports how each delivery was
/// acknowledged.
#[derive(Default)]
pub struct InMemoryEventChannel {
    published: Mutex<Vec<PublishedMessage>>,
    consumers: Mutex<Vec<(QueueBinding, Arc<dyn MessageHandler>)>>,
}

impl std::fmt::Debug for InMemoryEventChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryEventChannel")
            .field("published", &self.published)
            .finish_non_exhaustive()
    }
}

impl InMemoryEventChannel {
    /// Create a channel with no messages and no consumers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every published message, in publish order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().unwrap().clone()
    }

    /// Returns the published messages with the given routing key.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn published_with_key(&self, routing_key: &str) -> Vec<PublishedMessage> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.routing_key == routing_key)
            .cloned()
            .collect()
    }

    /// Returns the bindings registered through `consume`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn bindings(&self) -> Vec<QueueBinding> {
        self.consumers
            .lock()
            .unwrap()
            .iter()
            .map(|(binding, _)| binding.clone())
            .collect()
    }

    /// Delivers a raw body to every consumer bound to `exchange` with a
    /// matching routing key, one delivery per consumer, and returns the
    /// acknowledgement each handler produced.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub async fn deliver(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &[u8],
    ) -> Vec<Acknowledgement> {
        let handlers: Vec<Arc<dyn MessageHandler>> = self
            .consumers
            .lock()
            .unwrap()
            .iter()
            .filter(|(binding, _)| {
                binding.exchange == exchange && topic_matches(&binding.routing_key, routing_key)
            })
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        let mut acks = Vec::with_capacity(handlers.len());
        for handler in handlers {
            acks.push(dispatch(handler.as_ref(), payload).await);
        }
        acks
    }

    /// Serializes `payload` and delivers it like [`Self::deliver`].
    ///
    /// # Panics
    ///
    /// Panics if `payload` cannot be serialized or the internal mutex is
    /// poisoned.
    pub async fn deliver_json(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &serde_json::Value,
    ) -> Vec<Acknowledgement> {
        let body = serde_json::to_vec(payload).unwrap();
        self.deliver(exchange, routing_key, &body).await
    }
}

#[async_trait]
impl EventChannel for InMemoryEventChannel {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &serde_json::Value,
    ) -> Result<(), InventoryError> {
        self.published.lock().unwrap().push(PublishedMessage {
            exchange: exchange.to_owned(),
            routing_key: routing_key.to_owned(),
            payload: payload.clone(),
        });
        Ok(())
    }

    async fn consume(
        &self,
        binding: QueueBinding,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), InventoryError> {
        self.consumers.lock().unwrap().push((binding, handler));
        Ok(())
    }
}

/// An event channel whose publishes always fail with a channel error.
/// `consume` succeeds and registers nothing.
#[derive(Debug)]
pub struct FailingEventChannel;

#[async_trait]
impl EventChannel for FailingEventChannel {
    async fn publish(
        &self,
        _exchange: &str,
        _routing_key: &str,
        _payload: &serde_json::Value,
    ) -> Result<(), InventoryError> {
        Err(InventoryError::Channel("broker unreachable".into()))
    }

    async fn consume(
        &self,
        _binding: QueueBinding,
        _handler: Arc<dyn MessageHandler>,
    ) -> Result<(), InventoryError> {
        Ok(())
    }
}
