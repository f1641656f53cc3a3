//! `PostgreSQL` implementation of the `ProductStore` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{debug, error};
use uuid::Uuid;

use stockline_core::error::InventoryError;
use stockline_core::product::{NewProduct, Product};
use stockline_core::store::{DecrementOutcome, ProductStore};

use crate::schema;

/// Row shape of the `products` table.
#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    price: f64,
    qty: i64,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            price: row.price,
            qty: row.qty,
            created_at: row.created_at,
        }
    }
}

fn persistence_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> InventoryError {
    move |e| {
        error!(operation, error = %e, "product store query failed");
        InventoryError::Persistence(format!("{operation} failed: {e}"))
    }
}

/// PostgreSQL-backed product store.
#[derive(Debug, Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    /// Creates a new `PgProductStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn create(&self, product: &NewProduct) -> Result<Product, InventoryError> {
        let row: ProductRow = sqlx::query_as(schema::INSERT_PRODUCT)
            .bind(&product.name)
            .bind(product.price)
            .bind(product.qty)
            .fetch_one(&self.pool)
            .await
            .map_err(persistence_error("insert product"))?;
        debug!(product_id = %row.id, "product inserted");
        Ok(row.into())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Product>, InventoryError> {
        let row: Option<ProductRow> = sqlx::query_as(schema::SELECT_PRODUCT_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence_error("select product"))?;
        Ok(row.map(Product::from))
    }

    async fn list_all(&self) -> Result<Vec<Product>, InventoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(schema::SELECT_ALL_PRODUCTS)
            .fetch_all(&self.pool)
            .await
            .map_err(persistence_error("list products"))?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn conditional_decrement(
        &self,
        id: Uuid,
        amount: i64,
    ) -> Result<DecrementOutcome, InventoryError> {
        let row: Option<ProductRow> = sqlx::query_as(schema::CONDITIONAL_DECREMENT)
            .bind(id)
            .bind(amount)
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence_error("conditional decrement"))?;

        Ok(match row {
            Some(row) => {
                debug!(product_id = %id, amount, new_qty = row.qty, "conditional decrement applied");
                DecrementOutcome::Applied(row.into())
            }
            None => {
                debug!(product_id = %id, amount, "conditional decrement matched no rows");
                DecrementOutcome::Rejected
            }
        })
    }
}
