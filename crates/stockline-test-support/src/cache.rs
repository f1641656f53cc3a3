//! Test caches — failing `ProductCache` implementations for tests.

use std::time::Duration;

use async_trait::async_trait;
use stockline_core::cache::ProductCache;
use stockline_core::error::InventoryError;
use stockline_core::product::Product;
use uuid::Uuid;

/// A cache that always returns a cache error. Useful for testing that cache
/// failures propagate as typed errors instead of falling back silently.
#[derive(Debug)]
pub struct FailingProductCache;

#[async_trait]
impl ProductCache for FailingProductCache {
    async fn get(&self, _id: Uuid) -> Result<Option<Product>, InventoryError> {
        Err(InventoryError::Cache("connection reset".into()))
    }

    async fn set(&self, _product: &Product, _ttl: Duration) -> Result<(), InventoryError> {
        Err(InventoryError::Cache("connection reset".into()))
    }

    async fn set_if_lower(
        &self,
        _product: &Product,
        _ttl: Duration,
    ) -> Result<bool, InventoryError> {
        Err(InventoryError::Cache("connection reset".into()))
    }

    async fn invalidate(&self, _id: Uuid) -> Result<(), InventoryError> {
        Err(InventoryError::Cache("connection reset".into()))
    }
}
