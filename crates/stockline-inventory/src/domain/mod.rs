//! Commands and events of the inventory context.

pub mod commands;
pub mod events;
