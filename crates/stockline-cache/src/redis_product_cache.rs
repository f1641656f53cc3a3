//! Redis-backed product snapshot cache.
//!
//! Snapshots are stored as JSON strings under `product:<id>` with a
//! millisecond expiry (`PSETEX`), so sub-second TTLs behave as configured.
//! `set_if_lower` runs as a Lua script so the quantity compare and the write
//! are atomic on the server.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};
use tracing::{debug, error};
use uuid::Uuid;

use stockline_core::cache::{ProductCache, product_key};
use stockline_core::error::InventoryError;
use stockline_core::product::Product;

/// Writes `ARGV[1]` with a `ARGV[3]` ms expiry unless the snapshot at
/// `KEYS[1]` holds a quantity below `ARGV[2]`. Returns 1 if written.
const SET_IF_LOWER_SCRIPT: &str = r"
local current = redis.call('GET', KEYS[1])
if current then
  local ok, cached = pcall(cjson.decode, current)
  if ok and type(cached) == 'table' then
    local qty = tonumber(cached['qty'])
    if qty ~= nil and qty < tonumber(ARGV[2]) then
      return 0
    end
  end
end
redis.call('PSETEX', KEYS[1], ARGV[3], ARGV[1])
return 1
";

/// Redis product cache with TTL-based expiration.
///
/// Cloning is cheap; every clone shares the same `ConnectionManager`, which
/// reconnects on its own after transport failures.
#[derive(Clone)]
pub struct RedisProductCache {
    conn_manager: ConnectionManager,
    set_if_lower: Script,
}

impl RedisProductCache {
    /// Connects to Redis.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::Cache` if the URL is invalid or the initial
    /// connection fails.
    pub async fn connect(redis_url: &str) -> Result<Self, InventoryError> {
        let client = Client::open(redis_url)
            .map_err(|e| InventoryError::Cache(format!("failed to create Redis client: {e}")))?;
        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            InventoryError::Cache(format!("failed to create Redis connection manager: {e}"))
        })?;
        Ok(Self::new(conn_manager))
    }

    /// Wraps an existing connection manager.
    #[must_use]
    pub fn new(conn_manager: ConnectionManager) -> Self {
        Self {
            conn_manager,
            set_if_lower: Script::new(SET_IF_LOWER_SCRIPT),
        }
    }
}

impl std::fmt::Debug for RedisProductCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisProductCache").finish_non_exhaustive()
    }
}

fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl ProductCache for RedisProductCache {
    async fn get(&self, id: Uuid) -> Result<Option<Product>, InventoryError> {
        let mut conn = self.conn_manager.clone();
        let key = product_key(id);

        let raw: Option<String> = conn.get(&key).await.map_err(|e| {
            error!(%key, error = %e, "redis GET failed");
            InventoryError::Cache(format!("failed to read {key}: {e}"))
        })?;

        raw.map(|json| {
            serde_json::from_str::<Product>(&json)
                .map_err(|e| InventoryError::Cache(format!("undecodable snapshot at {key}: {e}")))
        })
        .transpose()
    }

    async fn set(&self, product: &Product, ttl: Duration) -> Result<(), InventoryError> {
        let mut conn = self.conn_manager.clone();
        let key = product_key(product.id);
        let json = serde_json::to_string(product)
            .map_err(|e| InventoryError::Cache(format!("failed to encode snapshot: {e}")))?;
        let millis = ttl_millis(ttl);

        let _: () = conn.pset_ex(&key, json, millis).await.map_err(|e| {
            error!(%key, error = %e, "redis PSETEX failed");
            InventoryError::Cache(format!("failed to write {key}: {e}"))
        })?;

        debug!(%key, ttl_ms = millis, qty = product.qty, "snapshot cached");
        Ok(())
    }

    async fn set_if_lower(&self, product: &Product, ttl: Duration) -> Result<bool, InventoryError> {
        let mut conn = self.conn_manager.clone();
        let key = product_key(product.id);
        let json = serde_json::to_string(product)
            .map_err(|e| InventoryError::Cache(format!("failed to encode snapshot: {e}")))?;
        let millis = ttl_millis(ttl);

        let written: i64 = self
            .set_if_lower
            .key(&key)
            .arg(json)
            .arg(product.qty)
            .arg(millis)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                error!(%key, error = %e, "redis conditional write failed");
                InventoryError::Cache(format!("failed to write {key}: {e}"))
            })?;

        debug!(%key, ttl_ms = millis, qty = product.qty, written, "conditional snapshot write");
        Ok(written == 1)
    }

    async fn invalidate(&self, id: Uuid) -> Result<(), InventoryError> {
        let mut conn = self.conn_manager.clone();
        let key = product_key(id);

        let removed: u64 = conn.del(&key).await.map_err(|e| {
            error!(%key, error = %e, "redis DEL failed");
            InventoryError::Cache(format!("failed to delete {key}: {e}"))
        })?;

        debug!(%key, removed, "snapshot invalidated");
        Ok(())
    }
}
