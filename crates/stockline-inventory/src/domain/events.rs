//! Events of the inventory context.
//!
//! Outbound events are published on the product exchange; `OrderCreated` is
//! the only inbound event. All payloads are camelCase JSON.

use serde::{Deserialize, Serialize};
use stockline_core::error::InventoryError;
use stockline_core::product::Product;
use uuid::Uuid;

/// Routing key for product creation.
pub const PRODUCT_CREATED_ROUTING_KEY: &str = "product.created";
/// Routing key for a committed stock decrement.
pub const STOCK_UPDATED_ROUTING_KEY: &str = "stock_updated";
/// Routing key for a rejected stock decrement.
pub const STOCK_INSUFFICIENT_ROUTING_KEY: &str = "stock_insufficient";
/// Routing key of inbound order events.
pub const ORDER_CREATED_ROUTING_KEY: &str = "order.created";

/// Emitted after a decrement commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdated {
    /// The product identifier.
    pub product_id: Uuid,
    /// Stored quantity after the decrement.
    pub new_quantity: i64,
}

/// Why a decrement was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsufficientReason {
    /// No product exists with the requested identifier.
    #[serde(rename = "not found")]
    NotFound,
    /// The product exists but holds fewer units than requested.
    #[serde(rename = "insufficient stock")]
    InsufficientStock,
}

/// Emitted when a decrement is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockInsufficient {
    /// The product identifier.
    pub product_id: Uuid,
    /// Units the caller asked for.
    pub requested_quantity: i64,
    /// Units in stock when the rejection was decided. Absent when not found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<i64>,
    /// Product name. Absent when not found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    /// Rejection reason.
    pub reason: InsufficientReason,
}

/// Outbound event variants.
#[derive(Debug, Clone, PartialEq)]
pub enum StockEvent {
    /// A product was created; the payload is the full record.
    ProductCreated(Product),
    /// A decrement committed.
    StockUpdated(StockUpdated),
    /// A decrement was rejected.
    StockInsufficient(StockInsufficient),
}

impl StockEvent {
    /// `stock_updated` for a product as it stands after a decrement.
    #[must_use]
    pub fn stock_updated(product: &Product) -> Self {
        Self::StockUpdated(StockUpdated {
            product_id: product.id,
            new_quantity: product.qty,
        })
    }

    /// `stock_insufficient` for an identifier that resolved to nothing.
    #[must_use]
    pub fn not_found(product_id: Uuid, requested_quantity: i64) -> Self {
        Self::StockInsufficient(StockInsufficient {
            product_id,
            requested_quantity,
            available: None,
            product_name: None,
            reason: InsufficientReason::NotFound,
        })
    }

    /// `stock_insufficient` for a product holding too few units.
    #[must_use]
    pub fn insufficient(product: &Product, requested_quantity: i64) -> Self {
        Self::StockInsufficient(StockInsufficient {
            product_id: product.id,
            requested_quantity,
            available: Some(product.qty),
            product_name: Some(product.name.clone()),
            reason: InsufficientReason::InsufficientStock,
        })
    }

    /// Routing key the event is published under.
    #[must_use]
    pub fn routing_key(&self) -> &'static str {
        match self {
            Self::ProductCreated(_) => PRODUCT_CREATED_ROUTING_KEY,
            Self::StockUpdated(_) => STOCK_UPDATED_ROUTING_KEY,
            Self::StockInsufficient(_) => STOCK_INSUFFICIENT_ROUTING_KEY,
        }
    }

    /// JSON message body.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::Channel` if the payload cannot be encoded.
    pub fn to_payload(&self) -> Result<serde_json::Value, InventoryError> {
        let encoded = match self {
            Self::ProductCreated(product) => serde_json::to_value(product),
            Self::StockUpdated(body) => serde_json::to_value(body),
            Self::StockInsufficient(body) => serde_json::to_value(body),
        };
        encoded.map_err(|e| {
            InventoryError::Channel(format!("failed to encode {}: {e}", self.routing_key()))
        })
    }
}

/// Inbound order event. Fields other than these are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    /// Ordered product.
    pub product_id: Uuid,
    /// Ordered units.
    pub quantity: i64,
}
