//! Test stores — in-memory `ProductStore` implementations for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use stockline_core::clock::{Clock, SystemClock};
use stockline_core::error::InventoryError;
use stockline_core::product::{NewProduct, Product};
use stockline_core::store::{DecrementOutcome, ProductStore};
use uuid::Uuid;

/// A product store backed by a mutex-guarded map. The conditional decrement
/// checks and updates under one lock acquisition, so it is atomic with
/// respect to every other call.
///
/// Every operation is counted, which lets tests assert that a path did or did
/// not reach the store.
pub struct InMemoryProductStore {
    products: Mutex<HashMap<Uuid, Product>>,
    clock: Arc<dyn Clock>,
    create_calls: AtomicUsize,
    get_by_id_calls: AtomicUsize,
    decrement_calls: AtomicUsize,
}

impl std::fmt::Debug for InMemoryProductStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryProductStore")
            .field("products", &self.products)
            .finish_non_exhaustive()
    }
}

impl Default for InMemoryProductStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryProductStore {
    /// Create an empty store stamping `created_at` from the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store stamping `created_at` from `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            products: Mutex::new(HashMap::new()),
            clock,
            create_calls: AtomicUsize::new(0),
            get_by_id_calls: AtomicUsize::new(0),
            decrement_calls: AtomicUsize::new(0),
        }
    }

    /// Insert a product as-is, bypassing `create` and its counter.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn seed(&self, product: Product) {
        self.products.lock().unwrap().insert(product.id, product);
    }

    /// Returns the stored quantity, if the product exists.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn qty_of(&self, id: Uuid) -> Option<i64> {
        self.products.lock().unwrap().get(&id).map(|p| p.qty)
    }

    /// Number of `create` calls so far.
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of `get_by_id` calls so far.
    pub fn get_by_id_calls(&self) -> usize {
        self.get_by_id_calls.load(Ordering::SeqCst)
    }

    /// Number of `conditional_decrement` calls so far.
    pub fn decrement_calls(&self) -> usize {
        self.decrement_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn create(&self, product: &NewProduct) -> Result<Product, InventoryError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let created = Product {
            id: Uuid::new_v4(),
            name: product.name.clone(),
            price: product.price,
            qty: product.qty,
            created_at: self.clock.now(),
        };
        self.products
            .lock()
            .unwrap()
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Product>, InventoryError> {
        self.get_by_id_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.products.lock().unwrap().get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Product>, InventoryError> {
        let mut all: Vec<Product> = self.products.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn conditional_decrement(
        &self,
        id: Uuid,
        amount: i64,
    ) -> Result<DecrementOutcome, InventoryError> {
        self.decrement_calls.fetch_add(1, Ordering::SeqCst);
        let mut products = self.products.lock().unwrap();
        match products.get_mut(&id) {
            Some(product) if product.qty >= amount => {
                product.qty -= amount;
                Ok(DecrementOutcome::Applied(product.clone()))
            }
            _ => Ok(DecrementOutcome::Rejected),
        }
    }
}

/// A product store that always returns a persistence error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingProductStore;

#[async_trait]
impl ProductStore for FailingProductStore {
    async fn create(&self, _product: &NewProduct) -> Result<Product, InventoryError> {
        Err(InventoryError::Persistence("connection refused".into()))
    }

    async fn get_by_id(&self, _id: Uuid) -> Result<Option<Product>, InventoryError> {
        Err(InventoryError::Persistence("connection refused".into()))
    }

    async fn list_all(&self) -> Result<Vec<Product>, InventoryError> {
        Err(InventoryError::Persistence("connection refused".into()))
    }

    async fn conditional_decrement(
        &self,
        _id: Uuid,
        _amount: i64,
    ) -> Result<DecrementOutcome, InventoryError> {
        Err(InventoryError::Persistence("connection refused".into()))
    }
}
