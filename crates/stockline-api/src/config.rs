//! Process configuration read from environment variables.

use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use stockline_core::channel::QueueBinding;
use stockline_inventory::application::InventorySettings;
use stockline_inventory::application::order_listener::{ORDER_EXCHANGE, ORDER_QUEUE};
use stockline_inventory::domain::events::ORDER_CREATED_ROUTING_KEY;

use crate::error::AppError;

/// Server configuration, resolved once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Redis connection string.
    pub redis_url: String,
    /// AMQP broker connection string.
    pub amqp_url: String,
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Upper bound of the database pool.
    pub database_max_connections: u32,
    /// Lifetime of cached product snapshots.
    pub cache_ttl: Duration,
    /// Upper bound on each store, cache and broker round-trip.
    pub io_timeout: Duration,
    /// Exchange outbound events are published on.
    pub product_exchange: String,
    /// Where order events are consumed from.
    pub order_binding: QueueBinding,
    /// Maximum in-flight order deliveries.
    pub consumer_prefetch: u16,
}

// Connection strings may carry credentials.
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_max_connections", &self.database_max_connections)
            .field("cache_ttl", &self.cache_ttl)
            .field("io_timeout", &self.io_timeout)
            .field("product_exchange", &self.product_exchange)
            .field("order_binding", &self.order_binding)
            .field("consumer_prefetch", &self.consumer_prefetch)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value cannot be parsed.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of
    /// a variable if it is set.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let cache_ttl_secs: u64 = parsed(&lookup, "CACHE_TTL_SECS", 60)?;
        let io_timeout_ms: u64 = parsed(&lookup, "IO_TIMEOUT_MS", 5000)?;
        if cache_ttl_secs == 0 {
            return Err(AppError::Config("CACHE_TTL_SECS must be positive".into()));
        }
        if io_timeout_ms == 0 {
            return Err(AppError::Config("IO_TIMEOUT_MS must be positive".into()));
        }

        Ok(Self {
            database_url: required(&lookup, "DATABASE_URL")?,
            redis_url: required(&lookup, "REDIS_URL")?,
            amqp_url: required(&lookup, "AMQP_URL")?,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parsed(&lookup, "PORT", 3000)?,
            database_max_connections: parsed(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            io_timeout: Duration::from_millis(io_timeout_ms),
            product_exchange: lookup("PRODUCT_EXCHANGE")
                .unwrap_or_else(|| "product.exchange".to_string()),
            order_binding: QueueBinding::new(
                lookup("ORDER_EXCHANGE").unwrap_or_else(|| ORDER_EXCHANGE.to_string()),
                lookup("ORDER_QUEUE").unwrap_or_else(|| ORDER_QUEUE.to_string()),
                lookup("ORDER_ROUTING_KEY")
                    .unwrap_or_else(|| ORDER_CREATED_ROUTING_KEY.to_string()),
            ),
            consumer_prefetch: parsed(&lookup, "CONSUMER_PREFETCH", 32)?,
        })
    }

    /// Engine settings derived from this configuration.
    #[must_use]
    pub fn inventory_settings(&self) -> InventorySettings {
        InventorySettings {
            product_exchange: self.product_exchange.clone(),
            cache_ttl: self.cache_ttl,
            io_timeout: self.io_timeout,
        }
    }

    /// The address to listen on.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `HOST:PORT` is not a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, AppError> {
    lookup(key).ok_or_else(|| AppError::Config(format!("{key} environment variable must be set")))
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| AppError::Config(format!("{key} is invalid ({raw}): {e}"))),
        None => Ok(default),
    }
}
