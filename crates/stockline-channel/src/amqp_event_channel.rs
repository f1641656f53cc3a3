//! AMQP implementation of the `EventChannel` trait.
//!
//! # Topology
//!
//! - Exchanges are declared `topic` and durable, on first use.
//! - Consumers declare a durable, named queue and bind it to the exchange
//!   with the requested routing key.
//!
//! # Delivery semantics
//!
//! Publishing is fire-and-forget: the message is handed to the broker and
//! publisher confirms are not awaited. Consumption is at-least-once with
//! manual acknowledgement. A handler success acks; a handler failure nacks
//! without requeue, so the message is dropped (no dead-letter exchange is
//! configured). A crash between delivery and ack causes redelivery.
//!
//! # Concurrency
//!
//! `basic.qos` caps unacknowledged deliveries at the broker, and a semaphore
//! of the same size caps handler tasks in process. The receive loop only
//! waits on the next delivery or on a free worker permit.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions, BasicQosOptions,
    ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use stockline_core::channel::{
    Acknowledgement, EventChannel, MessageHandler, QueueBinding, dispatch,
};
use stockline_core::error::InventoryError;

/// Persistent delivery mode (AMQP `delivery-mode = 2`).
const PERSISTENT: u8 = 2;

/// Consumer-side tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmqpChannelSettings {
    /// Maximum unacknowledged deliveries and concurrent handler tasks per
    /// consumer.
    pub prefetch: u16,
}

impl Default for AmqpChannelSettings {
    fn default() -> Self {
        Self { prefetch: 32 }
    }
}

/// Event channel over a single AMQP connection and channel.
pub struct AmqpEventChannel {
    connection: Connection,
    channel: Channel,
    settings: AmqpChannelSettings,
    declared_exchanges: Mutex<HashSet<String>>,
}

impl std::fmt::Debug for AmqpEventChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmqpEventChannel")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

fn channel_error(context: &str, e: &lapin::Error) -> InventoryError {
    InventoryError::Channel(format!("{context}: {e}"))
}

impl AmqpEventChannel {
    /// Connects to the broker at `amqp_url` and opens a channel.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::Channel` if the connection or channel cannot
    /// be opened.
    pub async fn connect(
        amqp_url: &str,
        settings: AmqpChannelSettings,
    ) -> Result<Self, InventoryError> {
        info!("connecting to AMQP broker");
        let connection = Connection::connect(amqp_url, ConnectionProperties::default())
            .await
            .map_err(|e| channel_error("failed to connect to broker", &e))?;
        let channel = connection
            .create_channel()
            .await
            .map_err(|e| channel_error("failed to open channel", &e))?;
        info!(prefetch = settings.prefetch, "AMQP channel ready");

        Ok(Self {
            connection,
            channel,
            settings,
            declared_exchanges: Mutex::new(HashSet::new()),
        })
    }

    /// Closes the channel and the connection. Deliveries not yet settled
    /// go back to their queues.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::Channel` if the broker rejects the close.
    pub async fn close(&self) -> Result<(), InventoryError> {
        self.channel
            .close(200, "shutdown")
            .await
            .map_err(|e| channel_error("failed to close channel", &e))?;
        self.connection
            .close(200, "shutdown")
            .await
            .map_err(|e| channel_error("failed to close connection", &e))?;
        info!("AMQP connection closed");
        Ok(())
    }

    fn is_declared(&self, exchange: &str) -> bool {
        self.declared_exchanges
            .lock()
            .is_ok_and(|declared| declared.contains(exchange))
    }

    fn mark_declared(&self, exchange: &str) {
        if let Ok(mut declared) = self.declared_exchanges.lock() {
            declared.insert(exchange.to_owned());
        }
    }

    async fn ensure_exchange(&self, exchange: &str) -> Result<(), InventoryError> {
        if self.is_declared(exchange) {
            return Ok(());
        }
        self.channel
            .exchange_declare(
                exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..ExchangeDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| channel_error(&format!("failed to declare exchange {exchange}"), &e))?;
        self.mark_declared(exchange);
        debug!(exchange, "exchange declared");
        Ok(())
    }
}

#[async_trait]
impl EventChannel for AmqpEventChannel {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &serde_json::Value,
    ) -> Result<(), InventoryError> {
        self.ensure_exchange(exchange).await?;
        let body = serde_json::to_vec(payload)
            .map_err(|e| InventoryError::Channel(format!("failed to encode payload: {e}")))?;

        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_delivery_mode(PERSISTENT);

        // The returned confirm is dropped on purpose: the channel layer does
        // not wait for the broker or any consumer.
        let _confirm = self
            .channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                &body,
                properties,
            )
            .await
            .map_err(|e| {
                error!(exchange, routing_key, error = %e, "failed to publish event");
                channel_error(&format!("failed to publish to {exchange}/{routing_key}"), &e)
            })?;

        debug!(exchange, routing_key, bytes = body.len(), "event published");
        Ok(())
    }

    async fn consume(
        &self,
        binding: QueueBinding,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), InventoryError> {
        self.ensure_exchange(&binding.exchange).await?;

        self.channel
            .queue_declare(
                &binding.queue,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| channel_error(&format!("failed to declare queue {}", binding.queue), &e))?;

        self.channel
            .queue_bind(
                &binding.queue,
                &binding.exchange,
                &binding.routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| channel_error(&format!("failed to bind queue {}", binding.queue), &e))?;

        self.channel
            .basic_qos(self.settings.prefetch, BasicQosOptions::default())
            .await
            .map_err(|e| channel_error("failed to set prefetch", &e))?;

        let consumer_tag = format!("{}-consumer", binding.queue);
        let mut consumer = self
            .channel
            .basic_consume(
                &binding.queue,
                &consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| channel_error(&format!("failed to consume {}", binding.queue), &e))?;

        info!(
            exchange = %binding.exchange,
            queue = %binding.queue,
            routing_key = %binding.routing_key,
            prefetch = self.settings.prefetch,
            "consumer started"
        );

        let workers = Arc::new(Semaphore::new(usize::from(self.settings.prefetch.max(1))));
        let queue = binding.queue;

        tokio::spawn(async move {
            while let Some(next) = consumer.next().await {
                let delivery = match next {
                    Ok(delivery) => delivery,
                    Err(e) => {
                        error!(%queue, error = %e, "consumer stream error");
                        continue;
                    }
                };

                let Ok(permit) = Arc::clone(&workers).acquire_owned().await else {
                    break;
                };
                let handler = Arc::clone(&handler);
                let queue = queue.clone();

                tokio::spawn(async move {
                    let tag = delivery.delivery_tag;
                    let redelivered = delivery.redelivered;
                    let outcome = match dispatch(handler.as_ref(), &delivery.data).await {
                        Acknowledgement::Ack => delivery.ack(BasicAckOptions::default()).await,
                        Acknowledgement::Reject => {
                            delivery
                                .nack(BasicNackOptions {
                                    requeue: false,
                                    ..BasicNackOptions::default()
                                })
                                .await
                        }
                    };
                    if let Err(e) = outcome {
                        warn!(%queue, tag, redelivered, error = %e, "failed to settle delivery (may be redelivered)");
                    }
                    drop(permit);
                });
            }
            warn!(%queue, "consumer stream ended");
        });

        Ok(())
    }
}
