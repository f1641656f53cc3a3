//! In-process timed-expiry product cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use stockline_core::cache::ProductCache;
use stockline_core::clock::{Clock, SystemClock};
use stockline_core::error::InventoryError;
use stockline_core::product::Product;

#[derive(Debug, Clone)]
struct Entry {
    product: Product,
    expires_at: DateTime<Utc>,
}

/// A map of snapshots, each with its own deadline. An expired entry is
/// dropped when its key is read, and every write sweeps out all expired
/// entries, so keys that are never read again do not accumulate.
pub struct TtlProductCache {
    entries: Mutex<HashMap<Uuid, Entry>>,
    clock: Arc<dyn Clock>,
}

impl TtlProductCache {
    /// Creates an empty cache driven by the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty cache driven by `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Number of entries currently held, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    /// Returns `true` if no entries are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, Entry>>, InventoryError> {
        self.entries
            .lock()
            .map_err(|_| InventoryError::Cache("cache mutex poisoned".into()))
    }

    fn entry_for(&self, product: &Product, ttl: Duration) -> Result<Entry, InventoryError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| InventoryError::Cache(format!("ttl out of range: {e}")))?;
        Ok(Entry {
            product: product.clone(),
            expires_at: self.clock.now() + ttl,
        })
    }
}

fn sweep_expired(entries: &mut HashMap<Uuid, Entry>, now: DateTime<Utc>) {
    entries.retain(|_, entry| entry.expires_at > now);
}

impl Default for TtlProductCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TtlProductCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlProductCache").finish_non_exhaustive()
    }
}

#[async_trait]
impl ProductCache for TtlProductCache {
    async fn get(&self, id: Uuid) -> Result<Option<Product>, InventoryError> {
        let now = self.clock.now();
        let mut entries = self.lock()?;
        match entries.get(&id) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.product.clone())),
            Some(_) => {
                entries.remove(&id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, product: &Product, ttl: Duration) -> Result<(), InventoryError> {
        let entry = self.entry_for(product, ttl)?;
        let mut entries = self.lock()?;
        sweep_expired(&mut entries, self.clock.now());
        entries.insert(product.id, entry);
        Ok(())
    }

    async fn set_if_lower(&self, product: &Product, ttl: Duration) -> Result<bool, InventoryError> {
        let entry = self.entry_for(product, ttl)?;
        let mut entries = self.lock()?;
        sweep_expired(&mut entries, self.clock.now());
        if entries
            .get(&product.id)
            .is_some_and(|cached| cached.product.qty < product.qty)
        {
            return Ok(false);
        }
        entries.insert(product.id, entry);
        Ok(true)
    }

    async fn invalidate(&self, id: Uuid) -> Result<(), InventoryError> {
        self.lock()?.remove(&id);
        Ok(())
    }
}
