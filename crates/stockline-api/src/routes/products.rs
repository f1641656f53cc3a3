//! Routes for products and stock.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use stockline_core::product::Product;
use stockline_inventory::application::{command_handlers, query_handlers};
use stockline_inventory::domain::commands;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: f64,
    /// Initial stock.
    pub qty: i64,
}

/// Request body for POST /{id}/decrement.
#[derive(Debug, Deserialize)]
pub struct DecrementStockRequest {
    /// Units to take out of stock.
    pub quantity: i64,
}

/// POST /
#[instrument(skip(state, request), fields(name = %request.name))]
async fn create_product(
    State(state): State<AppState>,
    Json(request): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let command = commands::CreateProduct {
        correlation_id: Uuid::new_v4(),
        name: request.name,
        price: request.price,
        qty: request.qty,
    };

    info!(correlation_id = %command.correlation_id, "handling create_product command");

    let product = command_handlers::handle_create_product(&command, &state.inventory).await?;

    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /
#[instrument(skip(state))]
async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, ApiError> {
    let products = query_handlers::list_products(&state.inventory).await?;
    Ok(Json(products))
}

/// GET /{id}
#[instrument(skip(state))]
async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Product>, ApiError> {
    let product = query_handlers::get_product_by_id(product_id, &state.inventory).await?;
    Ok(Json(product))
}

/// POST /{id}/decrement
#[instrument(skip(state, request), fields(quantity = request.quantity))]
async fn decrement_stock(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(request): Json<DecrementStockRequest>,
) -> Result<Json<Product>, ApiError> {
    let command = commands::DecrementStock {
        correlation_id: Uuid::new_v4(),
        product_id,
        quantity: request.quantity,
    };

    info!(correlation_id = %command.correlation_id, "handling decrement_stock command");

    let product = command_handlers::handle_decrement_stock(&command, &state.inventory).await?;

    Ok(Json(product))
}

/// Returns the router for products.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_product).get(list_products))
        .route("/{id}", get(get_product))
        .route("/{id}/decrement", post(decrement_stock))
}
