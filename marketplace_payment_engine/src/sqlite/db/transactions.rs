use log::debug;
use mps_common::Money;
use sqlx::SqliteConnection;

use crate::db_types::{OrderId, PaymentTransaction, TransactionStatus};

/// Records a new `Pending` payment attempt for the order. The internal transaction reference is
/// the external-facing identifier the gateway echoes back in callbacks.
pub async fn insert_transaction(
    order_id: OrderId,
    amount: Money,
    transaction_ref: &str,
    payment_source: &str,
    conn: &mut SqliteConnection,
) -> Result<PaymentTransaction, sqlx::Error> {
    let tx: PaymentTransaction = sqlx::query_as(
        r#"
            INSERT INTO payment_transactions (order_id, amount, transaction_ref, payment_source)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(amount)
    .bind(transaction_ref)
    .bind(payment_source)
    .fetch_one(conn)
    .await?;
    debug!("💳️ Payment transaction [{}] created for order {} ({})", tx.transaction_ref, tx.order_id, tx.amount);
    Ok(tx)
}

pub async fn fetch_by_ref(
    transaction_ref: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentTransaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payment_transactions WHERE transaction_ref = $1")
        .bind(transaction_ref)
        .fetch_optional(conn)
        .await
}

/// Applies the terminal transition to a still-pending transaction, returning `None` when the
/// transaction has already left `Pending`.
///
/// The `status = 'Pending'` guard lives inside the UPDATE itself, so the idempotency check and
/// the mutation are one statement under the enclosing transaction's isolation; a duplicate
/// callback racing this one simply matches zero rows.
pub async fn finalize_transaction(
    transaction_ref: &str,
    status: TransactionStatus,
    external_ref: Option<&str>,
    raw_response: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentTransaction>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE payment_transactions
            SET status = $2, external_ref = COALESCE($3, external_ref), raw_response = $4
            WHERE transaction_ref = $1 AND status = 'Pending'
            RETURNING *;
        "#,
    )
    .bind(transaction_ref)
    .bind(status)
    .bind(external_ref)
    .bind(raw_response)
    .fetch_optional(conn)
    .await
}
