//! Inventory error taxonomy.

use thiserror::Error;
use uuid::Uuid;

/// Top-level error type shared by the engine and every collaborator.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InventoryError {
    /// The product is unknown to both the cache and the store.
    #[error("product not found: {0}")]
    NotFound(Uuid),

    /// The quantity predicate failed; the store was not mutated.
    #[error(
        "insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        /// The product that could not be decremented.
        product_id: Uuid,
        /// The amount that was requested.
        requested: i64,
        /// The quantity observed when the request was rejected.
        available: i64,
    },

    /// Input rejected before reaching any collaborator.
    #[error("validation error: {0}")]
    Validation(String),

    /// The durable store is unreachable or rejected the write.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The read cache is unreachable or returned an undecodable entry.
    #[error("cache error: {0}")]
    Cache(String),

    /// The event channel could not accept a message.
    #[error("channel error: {0}")]
    Channel(String),
}

impl InventoryError {
    /// Returns `true` for the two business rejections of a decrement
    /// (`NotFound` and `InsufficientStock`), as opposed to infrastructure
    /// or input failures.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::InsufficientStock { .. })
    }
}
