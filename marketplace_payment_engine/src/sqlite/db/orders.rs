use log::debug;
use mps_common::Money;
use sqlx::SqliteConnection;

use crate::db_types::{FulfilmentStatus, NewOrder, Order, OrderId, OrderLine};

/// Inserts the order header with a zero total. The real total is written by
/// [`update_order_total`] once every line has been priced and reserved, inside the same
/// enclosing transaction.
pub async fn insert_order(order: &NewOrder, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (user_id, total_price, payment_method, full_name, phone_number, address, note)
            VALUES ($1, 0, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(order.user_id)
    .bind(order.payment_method)
    .bind(&order.shipping.full_name)
    .bind(&order.shipping.phone_number)
    .bind(&order.shipping.address)
    .bind(&order.shipping.note)
    .fetch_one(conn)
    .await?;
    debug!("📝️ Order {} header inserted for user {}", order.id, order.user_id);
    Ok(order)
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_order_line(
    order_id: OrderId,
    product_id: i64,
    variant_id: Option<i64>,
    shop_id: i64,
    quantity: i64,
    line_total: Money,
    conn: &mut SqliteConnection,
) -> Result<OrderLine, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO order_lines (order_id, product_id, variant_id, shop_id, quantity, price)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(product_id)
    .bind(variant_id)
    .bind(shop_id)
    .bind(quantity)
    .bind(line_total)
    .fetch_one(conn)
    .await
}

pub async fn update_order_total(
    order_id: OrderId,
    total: Money,
    conn: &mut SqliteConnection,
) -> Result<Order, sqlx::Error> {
    sqlx::query_as("UPDATE orders SET total_price = $1 WHERE id = $2 RETURNING *")
        .bind(total)
        .bind(order_id)
        .fetch_one(conn)
        .await
}

pub async fn fetch_order(id: OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_order_lines(order_id: OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderLine>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM order_lines WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await
}

pub async fn fetch_orders_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at ASC")
        .bind(user_id)
        .fetch_all(conn)
        .await
}

pub async fn fetch_lines_for_shop(shop_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderLine>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM order_lines WHERE shop_id = $1 ORDER BY id ASC")
        .bind(shop_id)
        .fetch_all(conn)
        .await
}

pub async fn fetch_line(id: i64, conn: &mut SqliteConnection) -> Result<Option<OrderLine>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM order_lines WHERE id = $1").bind(id).fetch_optional(conn).await
}

/// Flips every line of the order to `Paid`. Called by the reconciliation transition on a
/// confirmed gateway payment.
pub async fn mark_lines_paid(order_id: OrderId, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE order_lines SET payment_status = 'Paid' WHERE order_id = $1")
        .bind(order_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn update_line_fulfilment(
    id: i64,
    new_status: FulfilmentStatus,
    conn: &mut SqliteConnection,
) -> Result<OrderLine, sqlx::Error> {
    sqlx::query_as("UPDATE order_lines SET fulfilment_status = $1 WHERE id = $2 RETURNING *")
        .bind(new_status)
        .bind(id)
        .fetch_one(conn)
        .await
}

pub async fn delete_line(id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM order_lines WHERE id = $1").bind(id).execute(conn).await?;
    Ok(())
}

/// Deletes the order header. Lines and payment transactions cascade with it.
pub async fn delete_order(id: OrderId, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM orders WHERE id = $1").bind(id).execute(conn).await?;
    debug!("📝️ Order {id} deleted");
    Ok(())
}
