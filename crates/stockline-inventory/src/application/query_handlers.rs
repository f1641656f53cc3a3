//! Query handlers for the inventory context.

use tracing::{debug, instrument};
use uuid::Uuid;

use stockline_core::error::InventoryError;
use stockline_core::product::Product;

use crate::application::context::InventoryContext;

/// Retrieves a product, serving the cached snapshot when one exists.
///
/// On a cache miss the store is read and the result cached, unless a
/// concurrent decrement has cached a lower quantity meanwhile. A cached
/// snapshot is returned as-is and may lag the store by up to one TTL.
///
/// # Errors
///
/// Returns `InventoryError::NotFound` if the product does not exist, and
/// `InventoryError::Cache` / `InventoryError::Persistence` for collaborator
/// failures.
#[instrument(skip(ctx), fields(product_id = %product_id))]
pub async fn get_product_by_id(
    product_id: Uuid,
    ctx: &InventoryContext,
) -> Result<Product, InventoryError> {
    if let Some(cached) = ctx.cached(product_id).await? {
        debug!("cache hit");
        return Ok(cached);
    }

    let product = ctx
        .stored(product_id)
        .await?
        .ok_or(InventoryError::NotFound(product_id))?;
    ctx.cache_observed(&product).await?;
    debug!("cache miss, snapshot populated");
    Ok(product)
}

/// Lists every product straight from the store. Not cached.
///
/// # Errors
///
/// Returns `InventoryError::Persistence` if the store cannot be read.
#[instrument(skip_all)]
pub async fn list_products(ctx: &InventoryContext) -> Result<Vec<Product>, InventoryError> {
    let products = ctx.stored_all().await?;
    debug!(count = products.len(), "products listed");
    Ok(products)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use stockline_cache::TtlProductCache;
    use stockline_core::cache::ProductCache;
    use stockline_core::error::InventoryError;
    use stockline_test_support::{
        FailingProductCache, FailingProductStore, InMemoryEventChannel, InMemoryProductStore,
    };
    use uuid::Uuid;

    use crate::application::command_handlers::handle_decrement_stock;
    use crate::application::query_handlers::{get_product_by_id, list_products};
    use crate::application::testing::{
        HeldWriteCache, context_with, harness, keyboard, patient_context,
    };
    use crate::domain::commands::DecrementStock;

    #[tokio::test]
    async fn test_get_product_by_id_populates_cache_on_miss() {
        // Arrange
        let h = harness();
        let product = keyboard(10);
        h.store.seed(product.clone());

        // Act
        let first = get_product_by_id(product.id, &h.ctx).await.unwrap();
        let second = get_product_by_id(product.id, &h.ctx).await.unwrap();

        // Assert
        assert_eq!(first, product);
        assert_eq!(second, product);
        assert_eq!(h.store.get_by_id_calls(), 1);
        assert!(h.cache.get(product.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_get_product_by_id_serves_cached_snapshot_without_store() {
        // Arrange
        let h = harness();
        let product = keyboard(4);
        h.cache
            .set(&product, Duration::from_secs(60))
            .await
            .unwrap();

        // Act
        let read = get_product_by_id(product.id, &h.ctx).await.unwrap();

        // Assert
        assert_eq!(read, product);
        assert_eq!(h.store.get_by_id_calls(), 0);
    }

    #[tokio::test]
    async fn test_read_through_cannot_overwrite_a_newer_decrement() {
        // Arrange: the reader's snapshot (10) is held until a decrement has
        // cached 9.
        let cache = Arc::new(HeldWriteCache::holding(10));
        let (ctx, store) = patient_context(cache.clone());
        let product = keyboard(10);
        store.seed(product.clone());
        let id = product.id;

        // Act
        let ctx_reader = ctx.clone();
        let reader = tokio::spawn(async move { get_product_by_id(id, &ctx_reader).await });
        cache.entered.notified().await;
        let command = DecrementStock {
            correlation_id: Uuid::new_v4(),
            product_id: id,
            quantity: 1,
        };
        let updated = handle_decrement_stock(&command, &ctx).await.unwrap();
        cache.release.notify_one();
        let read_before = reader.await.unwrap().unwrap();

        // Assert
        assert_eq!(read_before.qty, 10);
        assert_eq!(updated.qty, 9);
        assert_eq!(cache.inner.get(id).await.unwrap().unwrap().qty, 9);
        assert_eq!(get_product_by_id(id, &ctx).await.unwrap().qty, 9);
    }

    #[tokio::test]
    async fn test_get_product_by_id_returns_not_found() {
        // Arrange
        let h = harness();
        let unknown = Uuid::new_v4();

        // Act
        let result = get_product_by_id(unknown, &h.ctx).await;

        // Assert
        assert_eq!(result, Err(InventoryError::NotFound(unknown)));
        assert!(h.cache.is_empty());
    }

    #[tokio::test]
    async fn test_get_product_by_id_propagates_cache_failure() {
        // Arrange
        let store = Arc::new(InMemoryProductStore::new());
        let ctx = context_with(
            store.clone(),
            Arc::new(FailingProductCache),
            Arc::new(InMemoryEventChannel::new()),
        );

        // Act
        let result = get_product_by_id(Uuid::new_v4(), &ctx).await;

        // Assert
        assert!(matches!(result, Err(InventoryError::Cache(_))));
        assert_eq!(store.get_by_id_calls(), 0);
    }

    #[tokio::test]
    async fn test_list_products_returns_every_stored_product() {
        // Arrange
        let h = harness();
        h.store.seed(keyboard(1));
        h.store.seed(keyboard(2));

        // Act
        let products = list_products(&h.ctx).await.unwrap();

        // Assert
        assert_eq!(products.len(), 2);
        assert!(h.cache.is_empty());
    }

    #[tokio::test]
    async fn test_list_products_propagates_persistence_failure() {
        // Arrange
        let ctx = context_with(
            Arc::new(FailingProductStore),
            Arc::new(TtlProductCache::new()),
            Arc::new(InMemoryEventChannel::new()),
        );

        // Act
        let result = list_products(&ctx).await;

        // Assert
        assert!(matches!(result, Err(InventoryError::Persistence(_))));
    }
}
