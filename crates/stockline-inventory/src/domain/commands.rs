//! Commands for the inventory context.

use stockline_core::product::NewProduct;
use uuid::Uuid;

/// Command to create a product.
#[derive(Debug, Clone)]
pub struct CreateProduct {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: f64,
    /// Initial stock.
    pub qty: i64,
}

impl CreateProduct {
    /// The store input carried by this command.
    #[must_use]
    pub fn to_new_product(&self) -> NewProduct {
        NewProduct {
            name: self.name.clone(),
            price: self.price,
            qty: self.qty,
        }
    }
}

/// Command to take `quantity` units out of stock.
#[derive(Debug, Clone)]
pub struct DecrementStock {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The product identifier.
    pub product_id: Uuid,
    /// Units to remove; must be positive.
    pub quantity: i64,
}
