//! Stockline Store — PostgreSQL persistence for products.

pub mod pg_product_store;
pub mod schema;

pub use pg_product_store::PgProductStore;
