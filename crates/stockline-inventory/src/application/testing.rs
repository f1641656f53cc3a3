//! Engine wiring over in-memory collaborators for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use stockline_cache::TtlProductCache;
use stockline_core::cache::ProductCache;
use stockline_core::channel::EventChannel;
use stockline_core::error::InventoryError;
use stockline_core::product::Product;
use stockline_core::store::{DecrementOutcome, ProductStore};
use stockline_test_support::{InMemoryEventChannel, InMemoryProductStore};
use tokio::sync::Notify;
use uuid::Uuid;

use crate::application::{InventoryContext, InventorySettings};

pub(crate) struct Harness {
    pub ctx: InventoryContext,
    pub store: Arc<InMemoryProductStore>,
    pub cache: Arc<TtlProductCache>,
    pub channel: Arc<InMemoryEventChannel>,
}

pub(crate) fn harness() -> Harness {
    let store = Arc::new(InMemoryProductStore::new());
    let cache = Arc::new(TtlProductCache::new());
    let channel = Arc::new(InMemoryEventChannel::new());
    let ctx = context_with(store.clone(), cache.clone(), channel.clone());
    Harness {
        ctx,
        store,
        cache,
        channel,
    }
}

pub(crate) fn context_with(
    store: Arc<dyn ProductStore>,
    cache: Arc<dyn ProductCache>,
    channel: Arc<dyn EventChannel>,
) -> InventoryContext {
    InventoryContext::new(
        store,
        cache,
        channel,
        InventorySettings {
            io_timeout: Duration::from_millis(200),
            ..InventorySettings::default()
        },
    )
}

pub(crate) fn keyboard(qty: i64) -> Product {
    Product {
        id: Uuid::new_v4(),
        name: "Keyboard".into(),
        price: 100_000.0,
        qty,
        created_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
    }
}

/// Reads and invalidations reach the inner cache; every write fails.
pub(crate) struct ReadOnlyCache {
    pub inner: TtlProductCache,
    pub invalidate_fails: bool,
}

#[async_trait]
impl ProductCache for ReadOnlyCache {
    async fn get(&self, id: Uuid) -> Result<Option<Product>, InventoryError> {
        self.inner.get(id).await
    }

    async fn set(&self, _product: &Product, _ttl: Duration) -> Result<(), InventoryError> {
        Err(InventoryError::Cache("OOM command not allowed".into()))
    }

    async fn set_if_lower(
        &self,
        _product: &Product,
        _ttl: Duration,
    ) -> Result<bool, InventoryError> {
        Err(InventoryError::Cache("OOM command not allowed".into()))
    }

    async fn invalidate(&self, id: Uuid) -> Result<(), InventoryError> {
        if self.invalidate_fails {
            return Err(InventoryError::Cache("connection reset".into()));
        }
        self.inner.invalidate(id).await
    }
}

/// A store whose every call outlives any reasonable I/O timeout.
pub(crate) struct StalledStore;

#[async_trait]
impl ProductStore for StalledStore {
    async fn create(
        &self,
        _product: &stockline_core::product::NewProduct,
    ) -> Result<Product, InventoryError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(InventoryError::Persistence("unreachable".into()))
    }

    async fn get_by_id(&self, _id: Uuid) -> Result<Option<Product>, InventoryError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(None)
    }

    async fn list_all(&self) -> Result<Vec<Product>, InventoryError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Vec::new())
    }

    async fn conditional_decrement(
        &self,
        _id: Uuid,
        _amount: i64,
    ) -> Result<DecrementOutcome, InventoryError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(DecrementOutcome::Rejected)
    }
}

/// Applies decrements to the inner store, then stalls before answering, as
/// when the database commits and the reply is lost.
pub(crate) struct CommitThenStallStore {
    pub inner: InMemoryProductStore,
}

#[async_trait]
impl ProductStore for CommitThenStallStore {
    async fn create(
        &self,
        product: &stockline_core::product::NewProduct,
    ) -> Result<Product, InventoryError> {
        self.inner.create(product).await
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Product>, InventoryError> {
        self.inner.get_by_id(id).await
    }

    async fn list_all(&self) -> Result<Vec<Product>, InventoryError> {
        self.inner.list_all().await
    }

    async fn conditional_decrement(
        &self,
        id: Uuid,
        amount: i64,
    ) -> Result<DecrementOutcome, InventoryError> {
        let outcome = self.inner.conditional_decrement(id, amount).await;
        tokio::time::sleep(Duration::from_secs(30)).await;
        outcome
    }
}

/// Holds back the first conditional write of `held_qty` until `release`
/// is notified, signalling `entered` once it is waiting.
pub(crate) struct HeldWriteCache {
    pub inner: TtlProductCache,
    pub held_qty: i64,
    pub entered: Notify,
    pub release: Notify,
    armed: AtomicBool,
}

impl HeldWriteCache {
    pub fn holding(held_qty: i64) -> Self {
        Self {
            inner: TtlProductCache::new(),
            held_qty,
            entered: Notify::new(),
            release: Notify::new(),
            armed: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl ProductCache for HeldWriteCache {
    async fn get(&self, id: Uuid) -> Result<Option<Product>, InventoryError> {
        self.inner.get(id).await
    }

    async fn set(&self, product: &Product, ttl: Duration) -> Result<(), InventoryError> {
        self.inner.set(product, ttl).await
    }

    async fn set_if_lower(&self, product: &Product, ttl: Duration) -> Result<bool, InventoryError> {
        if product.qty == self.held_qty && self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.set_if_lower(product, ttl).await
    }

    async fn invalidate(&self, id: Uuid) -> Result<(), InventoryError> {
        self.inner.invalidate(id).await
    }
}

/// Context with an I/O timeout long enough for a held write to be released.
pub(crate) fn patient_context(
    cache: Arc<HeldWriteCache>,
) -> (InventoryContext, Arc<InMemoryProductStore>) {
    let store = Arc::new(InMemoryProductStore::new());
    let ctx = InventoryContext::new(
        store.clone(),
        cache,
        Arc::new(InMemoryEventChannel::new()),
        InventorySettings {
            io_timeout: Duration::from_secs(10),
            ..InventorySettings::default()
        },
    );
    (ctx, store)
}
