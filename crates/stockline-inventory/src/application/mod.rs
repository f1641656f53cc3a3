//! Engine operations and the order event consumer adapter.

pub mod command_handlers;
pub mod context;
pub mod order_listener;
pub mod query_handlers;

pub use context::{InventoryContext, InventorySettings};

#[cfg(test)]
pub(crate) mod testing;
