//! Shared application state.

use stockline_inventory::application::InventoryContext;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The inventory engine and its collaborators.
    pub inventory: InventoryContext,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(inventory: InventoryContext) -> Self {
        Self { inventory }
    }
}
