//! Product store abstraction.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::InventoryError;
use crate::product::{NewProduct, Product};

/// Result of a conditional decrement.
#[derive(Debug, Clone, PartialEq)]
pub enum DecrementOutcome {
    /// The predicate held and the row was updated; carries the post-update row.
    Applied(Product),
    /// Zero rows matched. The product is either absent or short on stock;
    /// the store result alone cannot tell which.
    Rejected,
}

/// Durable, authoritative product storage.
///
/// Implementations must be safe for concurrent use. `conditional_decrement`
/// is the only serialization point between concurrent decrements of the same
/// product and must be a single atomic predicate-update.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Insert a new product. The store assigns `id` and `created_at`.
    async fn create(&self, product: &NewProduct) -> Result<Product, InventoryError>;

    /// Point lookup by identifier.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Product>, InventoryError>;

    /// Returns every product.
    async fn list_all(&self) -> Result<Vec<Product>, InventoryError>;

    /// Atomically subtract `amount` from `qty` if and only if `qty >= amount`.
    async fn conditional_decrement(
        &self,
        id: Uuid,
        amount: i64,
    ) -> Result<DecrementOutcome, InventoryError>;
}
