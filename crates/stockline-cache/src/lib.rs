//! Stockline Cache — product snapshot caches.
//!
//! [`RedisProductCache`] is the shared cache used in deployment.
//! [`TtlProductCache`] is an in-process timed-expiry container with the same
//! contract, for single-node runs and tests.

pub mod redis_product_cache;
pub mod ttl_product_cache;

pub use redis_product_cache::RedisProductCache;
pub use ttl_product_cache::TtlProductCache;
