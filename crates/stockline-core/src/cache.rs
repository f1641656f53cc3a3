//! Read cache abstraction.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::InventoryError;
use crate::product::Product;

/// Prefix of every product cache key.
pub const PRODUCT_KEY_PREFIX: &str = "product:";

/// Returns the cache key for a product, `product:<id>`.
#[must_use]
pub fn product_key(id: Uuid) -> String {
    format!("{PRODUCT_KEY_PREFIX}{id}")
}

/// Per-product snapshot cache with timed expiry.
///
/// The cache never consults the store. Population and invalidation policy
/// belongs to the caller; the cache only owns expiry.
#[async_trait]
pub trait ProductCache: Send + Sync {
    /// Returns the cached snapshot, possibly stale.
    async fn get(&self, id: Uuid) -> Result<Option<Product>, InventoryError>;

    /// Overwrites the snapshot for `product.id` and resets its expiry.
    async fn set(&self, product: &Product, ttl: Duration) -> Result<(), InventoryError>;

    /// Stores the snapshot unless the cached one already holds fewer units.
    ///
    /// Stock only ever goes down, so a snapshot with a higher `qty` than the
    /// cached one was read before a later decrement and must not replace it.
    /// The compare and the write are one atomic step. Returns `true` if the
    /// snapshot was written.
    async fn set_if_lower(&self, product: &Product, ttl: Duration) -> Result<bool, InventoryError>;

    /// Removes the snapshot immediately.
    async fn invalidate(&self, id: Uuid) -> Result<(), InventoryError>;
}
