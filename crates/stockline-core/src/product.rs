//! Product records and create input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::InventoryError;

/// Authoritative product record as held by the store.
///
/// Cached snapshots carry the same shape; they are copies, never the source
/// of truth for `qty`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Store-assigned identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Unit price, always positive.
    pub price: f64,
    /// Units in stock, never negative.
    pub qty: i64,
    /// Set once by the store at insertion.
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Returns `true` if at least `amount` units are in stock.
    #[must_use]
    pub fn has_stock_for(&self, amount: i64) -> bool {
        self.qty >= amount
    }
}

/// Input for creating a product. Identifier and timestamp are assigned by
/// the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: f64,
    /// Initial stock.
    pub qty: i64,
}

impl NewProduct {
    /// Checks the create input.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::Validation` if the name is blank, the price
    /// is not a positive finite number, or the quantity is negative.
    pub fn validate(&self) -> Result<(), InventoryError> {
        if self.name.trim().is_empty() {
            return Err(InventoryError::Validation(
                "product name must not be empty".into(),
            ));
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(InventoryError::Validation(
                "price must be greater than zero".into(),
            ));
        }
        if self.qty < 0 {
            return Err(InventoryError::Validation(
                "quantity cannot be negative".into(),
            ));
        }
        Ok(())
    }
}

/// Checks a decrement amount.
///
/// # Errors
///
/// Returns `InventoryError::Validation` unless `amount` is strictly positive.
pub fn validate_amount(amount: i64) -> Result<(), InventoryError> {
    if amount <= 0 {
        return Err(InventoryError::Validation(format!(
            "decrement amount must be positive, got {amount}"
        )));
    }
    Ok(())
}
