//! Engine collaborators and the bounded round-trips made to them.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use stockline_core::cache::ProductCache;
use stockline_core::channel::EventChannel;
use stockline_core::error::InventoryError;
use stockline_core::product::{NewProduct, Product};
use stockline_core::store::{DecrementOutcome, ProductStore};

use crate::domain::events::StockEvent;

/// Engine tuning, resolved from configuration by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventorySettings {
    /// Exchange outbound events are published on.
    pub product_exchange: String,
    /// Lifetime of cached snapshots.
    pub cache_ttl: Duration,
    /// Upper bound on every store, cache and channel round-trip.
    pub io_timeout: Duration,
}

impl Default for InventorySettings {
    fn default() -> Self {
        Self {
            product_exchange: "product.exchange".to_owned(),
            cache_ttl: Duration::from_secs(60),
            io_timeout: Duration::from_secs(5),
        }
    }
}

/// The three collaborators the engine coordinates, plus its settings.
///
/// Cloning is cheap and every clone shares the same collaborators.
#[derive(Clone)]
pub struct InventoryContext {
    /// Authoritative product store.
    pub store: Arc<dyn ProductStore>,
    /// Read-through snapshot cache.
    pub cache: Arc<dyn ProductCache>,
    /// Outbound event channel.
    pub channel: Arc<dyn EventChannel>,
    /// Engine tuning.
    pub settings: InventorySettings,
}

impl std::fmt::Debug for InventoryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryContext")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl InventoryContext {
    /// Creates a context.
    #[must_use]
    pub fn new(
        store: Arc<dyn ProductStore>,
        cache: Arc<dyn ProductCache>,
        channel: Arc<dyn EventChannel>,
        settings: InventorySettings,
    ) -> Self {
        Self {
            store,
            cache,
            channel,
            settings,
        }
    }

    /// Runs `call`, failing with `on_timeout` if it outlives the I/O timeout.
    async fn bounded<T>(
        &self,
        operation: &str,
        on_timeout: fn(String) -> InventoryError,
        call: impl Future<Output = Result<T, InventoryError>>,
    ) -> Result<T, InventoryError> {
        let limit = self.settings.io_timeout;
        tokio::time::timeout(limit, call)
            .await
            .unwrap_or_else(|_| Err(on_timeout(format!("{operation} timed out after {limit:?}"))))
    }

    pub(crate) async fn stored(&self, id: Uuid) -> Result<Option<Product>, InventoryError> {
        self.bounded("store get_by_id", InventoryError::Persistence, self.store.get_by_id(id))
            .await
    }

    pub(crate) async fn stored_all(&self) -> Result<Vec<Product>, InventoryError> {
        self.bounded("store list_all", InventoryError::Persistence, self.store.list_all())
            .await
    }

    pub(crate) async fn insert(
        &self,
        product: &NewProduct,
    ) -> Result<Product, InventoryError> {
        self.bounded("store create", InventoryError::Persistence, self.store.create(product))
            .await
    }

    pub(crate) async fn take_stock(
        &self,
        id: Uuid,
        amount: i64,
    ) -> Result<DecrementOutcome, InventoryError> {
        self.bounded(
            "store conditional_decrement",
            InventoryError::Persistence,
            self.store.conditional_decrement(id, amount),
        )
        .await
    }

    pub(crate) async fn cached(&self, id: Uuid) -> Result<Option<Product>, InventoryError> {
        self.bounded("cache get", InventoryError::Cache, self.cache.get(id))
            .await
    }

    pub(crate) async fn cache_snapshot(&self, product: &Product) -> Result<(), InventoryError> {
        self.bounded(
            "cache set",
            InventoryError::Cache,
            self.cache.set(product, self.settings.cache_ttl),
        )
        .await
    }

    /// Caches a snapshot read from the store, unless the cache already holds
    /// a lower quantity written after a later decrement.
    pub(crate) async fn cache_observed(&self, product: &Product) -> Result<(), InventoryError> {
        let written = self
            .bounded(
                "cache set_if_lower",
                InventoryError::Cache,
                self.cache.set_if_lower(product, self.settings.cache_ttl),
            )
            .await?;
        if !written {
            debug!(product_id = %product.id, qty = product.qty, "newer snapshot already cached");
        }
        Ok(())
    }

    pub(crate) async fn drop_snapshot(&self, id: Uuid) -> Result<(), InventoryError> {
        self.bounded(
            "cache invalidate",
            InventoryError::Cache,
            self.cache.invalidate(id),
        )
        .await
    }

    /// Brings the cached snapshot down to `product` after a decrement. If
    /// the write fails the entry is invalidated instead, so the stale
    /// pre-decrement snapshot cannot be served.
    pub(crate) async fn refresh_snapshot(&self, product: &Product) -> Result<(), InventoryError> {
        let Err(set_error) = self.cache_observed(product).await else {
            return Ok(());
        };
        warn!(product_id = %product.id, error = %set_error, "cache refresh failed, invalidating");
        self.drop_snapshot(product.id).await
    }

    /// Publishes `event` on the product exchange. Failures are logged and
    /// dropped; the triggering operation has already committed.
    pub(crate) async fn publish(&self, event: &StockEvent) {
        let routing_key = event.routing_key();
        let exchange = self.settings.product_exchange.as_str();
        let outcome = match event.to_payload() {
            Ok(payload) => {
                self.bounded(
                    "channel publish",
                    InventoryError::Channel,
                    self.channel.publish(exchange, routing_key, &payload),
                )
                .await
            }
            Err(e) => Err(e),
        };
        match outcome {
            Ok(()) => debug!(exchange, routing_key, "event published"),
            Err(error) => warn!(exchange, routing_key, %error, "event publication failed, dropped"),
        }
    }
}
