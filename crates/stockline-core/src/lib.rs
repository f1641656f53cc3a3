//! Stockline Core — shared domain types and collaborator traits.
//!
//! This crate defines the product model, the error taxonomy, and the three
//! collaborator seams the inventory engine drives: the durable store, the
//! read cache, and the event channel. It contains no infrastructure code.

pub mod cache;
pub mod channel;
pub mod clock;
pub mod error;
pub mod product;
pub mod store;
