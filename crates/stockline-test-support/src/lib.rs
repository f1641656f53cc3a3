//! Shared test collaborators and utilities for the Stockline inventory service.

mod cache;
mod channel;
mod clock;
mod store;

pub use cache::FailingProductCache;
pub use channel::{FailingEventChannel, InMemoryEventChannel, PublishedMessage};
pub use clock::{FixedClock, ManualClock};
pub use store::{FailingProductStore, InMemoryProductStore};
