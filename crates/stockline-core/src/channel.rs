//! Event channel abstraction.
//!
//! A topic-routed publish/subscribe transport with per-message
//! acknowledgement. Delivery is at-least-once: a message can be handed to a
//! handler again if the process dies between delivery and acknowledgement,
//! so handlers must tolerate duplicates.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::InventoryError;

/// Durable queue bound to a routing key on a topic exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueBinding {
    /// Topic exchange to bind on.
    pub exchange: String,
    /// Durable, named queue.
    pub queue: String,
    /// Routing key pattern (`*` one word, `#` zero or more words).
    pub routing_key: String,
}

impl QueueBinding {
    /// Creates a binding.
    #[must_use]
    pub fn new(
        exchange: impl Into<String>,
        queue: impl Into<String>,
        routing_key: impl Into<String>,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            queue: queue.into(),
            routing_key: routing_key.into(),
        }
    }
}

/// What to tell the broker about a delivery once the handler has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgement {
    /// Remove the message permanently.
    Ack,
    /// Negative acknowledgement without requeue. The message is dropped;
    /// there is no dead-letter capture.
    Reject,
}

/// Processes one delivered message body.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handles a raw message body. Called once per delivery attempt.
    async fn handle(&self, payload: &[u8]) -> Result<(), InventoryError>;
}

/// Topic publish/subscribe transport.
#[async_trait]
pub trait EventChannel: Send + Sync {
    /// Declares `exchange` (durable, topic) if needed and hands `payload` off
    /// without waiting for any consumer.
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &serde_json::Value,
    ) -> Result<(), InventoryError>;

    /// Declares the exchange, the durable queue and the binding, then feeds
    /// every delivery to `handler`, acknowledging according to [`dispatch`].
    async fn consume(
        &self,
        binding: QueueBinding,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), InventoryError>;
}

/// Runs `handler` on one delivery and decides its acknowledgement:
/// success acks, any failure rejects without requeue.
pub async fn dispatch(handler: &dyn MessageHandler, payload: &[u8]) -> Acknowledgement {
    match handler.handle(payload).await {
        Ok(()) => {
            debug!("message handled, acknowledging");
            Acknowledgement::Ack
        }
        Err(error) => {
            warn!(%error, "message handler failed, rejecting without requeue");
            Acknowledgement::Reject
        }
    }
}

/// AMQP topic matching of a routing key against a binding pattern.
///
/// Words are dot-separated. `*` matches exactly one word and `#` matches
/// zero or more words.
#[must_use]
pub fn topic_matches(pattern: &str, routing_key: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = routing_key.split('.').collect();
    matches_words(&pattern, &key)
}

fn matches_words(pattern: &[&str], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((&"#", rest)) => (0..=key.len()).any(|skip| matches_words(rest, &key[skip..])),
        Some((&word, rest)) => match key.split_first() {
            Some((&head, tail)) => (word == "*" || word == head) && matches_words(rest, tail),
            None => false,
        },
    }
}
