//! SQL for the `products` table.
//!
//! The table itself is created by the workspace migrations; these are the
//! statements the store issues against it.

/// Inserts a product; `id` and `created_at` come from column defaults.
pub const INSERT_PRODUCT: &str = r"
INSERT INTO products (name, price, qty)
VALUES ($1, $2, $3)
RETURNING id, name, price, qty, created_at
";

/// Point lookup by identifier.
pub const SELECT_PRODUCT_BY_ID: &str = r"
SELECT id, name, price, qty, created_at
FROM products
WHERE id = $1
";

/// Full scan, oldest first.
pub const SELECT_ALL_PRODUCTS: &str = r"
SELECT id, name, price, qty, created_at
FROM products
ORDER BY created_at, id
";

/// Atomic conditional decrement. Matches zero rows when the product is
/// absent or `qty < $2`.
pub const CONDITIONAL_DECREMENT: &str = r"
UPDATE products
SET qty = qty - $2
WHERE id = $1 AND qty >= $2
RETURNING id, name, price, qty, created_at
";
