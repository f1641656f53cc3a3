//! Command handlers for the inventory context.
//!
//! Each handler coordinates the store, the cache and the event channel for
//! one mutation. The store's conditional decrement is the only point where
//! concurrent decrements of the same product are serialized; every other
//! step runs without holding any lock.

use tracing::{info, instrument, warn};

use stockline_core::error::InventoryError;
use stockline_core::product::{Product, validate_amount};
use stockline_core::store::DecrementOutcome;

use crate::application::context::InventoryContext;
use crate::domain::commands::{CreateProduct, DecrementStock};
use crate::domain::events::StockEvent;

/// Handles the `CreateProduct` command: validates the input, inserts the
/// record, caches it as returned by the store and publishes
/// `product.created`.
///
/// # Errors
///
/// Returns `InventoryError::Validation` for invalid input,
/// `InventoryError::Persistence` if the insert fails (nothing is cached or
/// published) and `InventoryError::Cache` if the snapshot cannot be written.
#[instrument(skip_all, fields(correlation_id = %command.correlation_id, name = %command.name))]
pub async fn handle_create_product(
    command: &CreateProduct,
    ctx: &InventoryContext,
) -> Result<Product, InventoryError> {
    let input = command.to_new_product();
    input.validate()?;

    let product = ctx.insert(&input).await?;
    ctx.cache_snapshot(&product).await?;
    ctx.publish(&StockEvent::ProductCreated(product.clone())).await;

    info!(product_id = %product.id, qty = product.qty, "product created");
    Ok(product)
}

/// Handles the `DecrementStock` command.
///
/// 1. Resolves a working copy, cache first, falling back to the store (and
///    caching what it finds).
/// 2. Rejects early if the working copy holds too few units.
/// 3. Issues the conditional decrement, which has the final say.
/// 4. Lowers the cached snapshot and publishes `stock_updated`.
///
/// If step 3 fails its outcome is unknown, so the cached snapshot is
/// invalidated before the error is returned.
///
/// Rejections publish `stock_insufficient` and leave the store untouched.
///
/// # Errors
///
/// Returns `InventoryError::Validation` if the amount is not positive,
/// `InventoryError::NotFound` for an unknown product,
/// `InventoryError::InsufficientStock` when the stock does not cover the
/// amount, and `InventoryError::Persistence` / `InventoryError::Cache` for
/// collaborator failures. A cache failure after step 3 is reported even
/// though the decrement has committed.
#[instrument(
    skip_all,
    fields(
        correlation_id = %command.correlation_id,
        product_id = %command.product_id,
        quantity = command.quantity
    )
)]
pub async fn handle_decrement_stock(
    command: &DecrementStock,
    ctx: &InventoryContext,
) -> Result<Product, InventoryError> {
    validate_amount(command.quantity)?;
    let product_id = command.product_id;
    let amount = command.quantity;

    let working = if let Some(cached) = ctx.cached(product_id).await? {
        cached
    } else {
        let Some(stored) = ctx.stored(product_id).await? else {
            return Err(reject_not_found(command, ctx).await);
        };
        ctx.cache_observed(&stored).await?;
        stored
    };

    if !working.has_stock_for(amount) {
        return Err(reject_insufficient(&working, amount, ctx).await);
    }

    let outcome = match ctx.take_stock(product_id, amount).await {
        Ok(outcome) => outcome,
        Err(e) => {
            // The decrement may have committed before the failure surfaced.
            if let Err(cache_error) = ctx.drop_snapshot(product_id).await {
                warn!(error = %cache_error, "could not invalidate snapshot after failed decrement");
            }
            return Err(e);
        }
    };

    match outcome {
        DecrementOutcome::Applied(updated) => {
            ctx.refresh_snapshot(&updated).await?;
            ctx.publish(&StockEvent::stock_updated(&updated)).await;
            info!(new_quantity = updated.qty, "stock decremented");
            Ok(updated)
        }
        DecrementOutcome::Rejected => {
            // The working copy was stale. Report against the store's current
            // quantity and correct the cache with it.
            let Some(current) = ctx.stored(product_id).await? else {
                return Err(reject_not_found(command, ctx).await);
            };
            ctx.refresh_snapshot(&current).await?;
            Err(reject_insufficient(&current, amount, ctx).await)
        }
    }
}

async fn reject_not_found(command: &DecrementStock, ctx: &InventoryContext) -> InventoryError {
    warn!("decrement rejected: product not found");
    ctx.publish(&StockEvent::not_found(command.product_id, command.quantity))
        .await;
    InventoryError::NotFound(command.product_id)
}

async fn reject_insufficient(
    product: &Product,
    amount: i64,
    ctx: &InventoryContext,
) -> InventoryError {
    warn!(available = product.qty, "decrement rejected: insufficient stock");
    ctx.publish(&StockEvent::insufficient(product, amount)).await;
    InventoryError::InsufficientStock {
        product_id: product.id,
        requested: amount,
        available: product.qty,
    }
}
