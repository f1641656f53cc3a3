//! Consumer adapter binding `order.created` deliveries to the decrement
//! path.
//!
//! Deliveries are at-least-once and no per-message ledger is kept, so a
//! redelivered order decrements again.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use stockline_core::channel::{MessageHandler, QueueBinding};
use stockline_core::error::InventoryError;

use crate::application::command_handlers::handle_decrement_stock;
use crate::application::context::InventoryContext;
use crate::domain::commands::DecrementStock;
use crate::domain::events::{ORDER_CREATED_ROUTING_KEY, OrderCreated};

/// Exchange order events are published on.
pub const ORDER_EXCHANGE: &str = "order.exchange";
/// Durable queue this service consumes order events from.
pub const ORDER_QUEUE: &str = "product_order_queue";

/// The binding used when none is configured.
#[must_use]
pub fn default_order_binding() -> QueueBinding {
    QueueBinding::new(ORDER_EXCHANGE, ORDER_QUEUE, ORDER_CREATED_ROUTING_KEY)
}

/// Decodes `order.created` bodies and runs the stock decrement.
#[derive(Debug, Clone)]
pub struct OrderCreatedListener {
    ctx: InventoryContext,
}

impl OrderCreatedListener {
    /// Creates a listener driving `ctx`.
    #[must_use]
    pub fn new(ctx: InventoryContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl MessageHandler for OrderCreatedListener {
    #[instrument(skip_all, fields(bytes = payload.len()))]
    async fn handle(&self, payload: &[u8]) -> Result<(), InventoryError> {
        let order: OrderCreated = serde_json::from_slice(payload).map_err(|e| {
            InventoryError::Validation(format!("malformed order.created payload: {e}"))
        })?;

        let command = DecrementStock {
            correlation_id: Uuid::new_v4(),
            product_id: order.product_id,
            quantity: order.quantity,
        };
        let updated = match handle_decrement_stock(&command, &self.ctx).await {
            Ok(updated) => updated,
            Err(e) if e.is_rejection() => {
                warn!(product_id = %order.product_id, error = %e, "order not applied to stock");
                return Err(e);
            }
            Err(e) => {
                error!(product_id = %order.product_id, error = %e, "order processing failed");
                return Err(e);
            }
        };

        info!(
            product_id = %updated.id,
            new_quantity = updated.qty,
            "order applied to stock"
        );
        Ok(())
    }
}

/// Starts consuming order events on `binding`.
///
/// # Errors
///
/// Returns `InventoryError::Channel` if the exchange, queue, binding or
/// consumer cannot be set up.
pub async fn start_order_listener(
    ctx: &InventoryContext,
    binding: QueueBinding,
) -> Result<(), InventoryError> {
    info!(
        exchange = %binding.exchange,
        queue = %binding.queue,
        routing_key = %binding.routing_key,
        "starting order listener"
    );
    let listener = Arc::new(OrderCreatedListener::new(ctx.clone()));
    ctx.channel.consume(binding, listener).await
}
