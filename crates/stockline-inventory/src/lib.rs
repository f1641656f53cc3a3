//! Stockline Inventory — the inventory consistency engine.
//!
//! Orchestrates product creation, cached reads and stock decrements across
//! the durable store, the read cache and the event channel, and binds the
//! decrement path to inbound `order.created` events.

pub mod application;
pub mod domain;
