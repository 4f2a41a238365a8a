//! Catalog access and the inventory ledger.
//!
//! [`reserve_stock`] and [`release_stock`] are the ledger's two operations. Neither manages its
//! own transaction; both mutate through whatever connection the caller hands in, so a failed
//! order build rolls the reservations back along with everything else.

use log::debug;
use mps_common::Money;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Product, ProductVariant, StockUnitId},
    traits::PaymentGatewayError,
};

pub async fn fetch_product(id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_variant(id: i64, conn: &mut SqliteConnection) -> Result<Option<ProductVariant>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM product_variants WHERE id = $1").bind(id).fetch_optional(conn).await
}

/// The quantity currently available on the stock unit. Missing units report zero.
pub async fn available_quantity(unit: StockUnitId, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let quantity: Option<i64> = match unit {
        StockUnitId::Product(id) => {
            sqlx::query_scalar("SELECT quantity FROM products WHERE id = $1").bind(id).fetch_optional(conn).await?
        },
        StockUnitId::Variant(id) => {
            sqlx::query_scalar("SELECT quantity FROM product_variants WHERE id = $1")
                .bind(id)
                .fetch_optional(conn)
                .await?
        },
    };
    Ok(quantity.unwrap_or(0))
}

/// Atomically reserves `quantity` units of stock, failing with `InsufficientStock` (and
/// mutating nothing) when not enough is available.
///
/// The decrement is a single conditional UPDATE guarded by `quantity >= requested`, so two
/// concurrent reservations racing for the last unit cannot both succeed: the store serializes
/// the writes and the loser's guard no longer holds.
pub async fn reserve_stock(
    unit: StockUnitId,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), PaymentGatewayError> {
    let sql = match unit {
        StockUnitId::Product(_) => "UPDATE products SET quantity = quantity - $1 WHERE id = $2 AND quantity >= $1",
        StockUnitId::Variant(_) => {
            "UPDATE product_variants SET quantity = quantity - $1 WHERE id = $2 AND quantity >= $1"
        },
    };
    let id = match unit {
        StockUnitId::Product(id) | StockUnitId::Variant(id) => id,
    };
    let result = sqlx::query(sql).bind(quantity).bind(id).execute(&mut *conn).await?;
    if result.rows_affected() == 0 {
        let available = available_quantity(unit, conn).await?;
        return Err(PaymentGatewayError::InsufficientStock { unit, available, requested: quantity });
    }
    debug!("📦️ Reserved {quantity} unit(s) on {unit}");
    Ok(())
}

/// Returns previously reserved stock to the unit. Always succeeds; used by the compensating
/// transaction that rejects an order line.
pub async fn release_stock(
    unit: StockUnitId,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), PaymentGatewayError> {
    let sql = match unit {
        StockUnitId::Product(_) => "UPDATE products SET quantity = quantity + $1 WHERE id = $2",
        StockUnitId::Variant(_) => "UPDATE product_variants SET quantity = quantity + $1 WHERE id = $2",
    };
    let id = match unit {
        StockUnitId::Product(id) | StockUnitId::Variant(id) => id,
    };
    sqlx::query(sql).bind(quantity).bind(id).execute(conn).await?;
    debug!("📦️ Released {quantity} unit(s) back to {unit}");
    Ok(())
}

pub async fn insert_product(
    shop_id: i64,
    name: &str,
    price: Money,
    quantity: i64,
    discount_percent: i64,
    conn: &mut SqliteConnection,
) -> Result<Product, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO products (shop_id, name, description, price, quantity, discount_percent)
            VALUES ($1, $2, '', $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(shop_id)
    .bind(name)
    .bind(price)
    .bind(quantity)
    .bind(discount_percent)
    .fetch_one(conn)
    .await
}

pub async fn insert_variant(
    product_id: i64,
    price: Money,
    quantity: i64,
    attributes: &str,
    conn: &mut SqliteConnection,
) -> Result<ProductVariant, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO product_variants (product_id, price, quantity, attributes)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(product_id)
    .bind(price)
    .bind(quantity)
    .bind(attributes)
    .fetch_one(conn)
    .await
}
