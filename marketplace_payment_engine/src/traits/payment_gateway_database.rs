use mps_common::Money;
use thiserror::Error;

use crate::{
    db_types::{
        CompensationOutcome,
        FulfilmentStatus,
        NewOrder,
        OrderId,
        OrderLine,
        OrderWithItems,
        PaymentTransaction,
        StockUnitId,
    },
    traits::{data_objects::Settlement, OrderManagement},
};

/// The write-side behaviour a backend must provide to act as the marketplace settlement core.
///
/// This covers:
/// * Building the order aggregate: reserving stock, pricing and persisting an order with all its
///   lines in one all-or-nothing transaction.
/// * The reconciliation state machine's terminal transition for gateway callbacks.
/// * The compensating transaction for rejected order lines.
/// * Shop-side fulfilment transitions.
#[allow(async_fn_in_trait)]
pub trait PaymentGatewayDatabase: Clone + OrderManagement {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Converts a cart into a persisted order inside a single atomic transaction.
    ///
    /// For every requested line the product is resolved (it must exist and be active), the
    /// optional variant is checked to belong to that product, the line is priced, and stock is
    /// reserved against the variant if present, else the product. The order total is the sum of
    /// the stored line totals. If the payment method is the online gateway, a `Pending`
    /// [`PaymentTransaction`] for the final total is created in the same transaction.
    ///
    /// Any failure rolls back every write and every reservation; no partial order survives.
    async fn create_order(&self, order: NewOrder) -> Result<OrderWithItems, PaymentGatewayError>;

    /// Applies a verified gateway callback to the order identified by `transaction_ref`.
    ///
    /// Inside one transaction: the order and its payment transaction are looked up, the reported
    /// amount (in minor units) is compared to the order total, the transaction is checked to
    /// still be `Pending`, and only then is the terminal transition applied: on success every
    /// line of the order becomes `Paid` and the transaction `Success`; on failure only the
    /// transaction moves, to `Failed`. The raw payload is stored either way.
    ///
    /// The `Pending` check runs inside the transaction's isolation, so two near-simultaneous
    /// duplicate callbacks cannot both mutate: the second fails with
    /// [`PaymentGatewayError::DuplicateProcessing`].
    async fn settle_transaction(
        &self,
        transaction_ref: &str,
        reported_amount: Money,
        settlement: Settlement,
        raw_payload: String,
    ) -> Result<PaymentTransaction, PaymentGatewayError>;

    /// The compensating transaction for a seller rejecting an order line: reserved stock is
    /// released back to the variant-else-product, the line is deleted, the order total is
    /// recomputed, and the order itself is deleted when no lines remain.
    ///
    /// Only lines belonging to `shop_id` that are still pending fulfilment and unpaid may be
    /// rejected.
    async fn reject_order_line(
        &self,
        shop_id: i64,
        line_id: i64,
    ) -> Result<CompensationOutcome, PaymentGatewayError>;

    /// Moves a line's fulfilment status strictly forward (Pending -> Confirmed -> Shipped).
    /// Only the shop the line belongs to may move it.
    async fn update_line_fulfilment(
        &self,
        shop_id: i64,
        line_id: i64,
        new_status: FulfilmentStatus,
    ) -> Result<OrderLine, PaymentGatewayError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), PaymentGatewayError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum PaymentGatewayError {
    #[error("We have an internal database engine error: {0}")]
    DatabaseError(String),
    #[error("Malformed order request: {0}")]
    ValidationError(String),
    #[error("Product {0} does not exist or is inactive")]
    ProductNotFound(i64),
    #[error("Variant {0} does not exist")]
    VariantNotFound(i64),
    #[error("Variant {variant_id} does not belong to product {product_id}")]
    VariantMismatch { variant_id: i64, product_id: i64 },
    #[error("Insufficient stock on {unit}: {available} available, {requested} requested")]
    InsufficientStock { unit: StockUnitId, available: i64, requested: i64 },
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The requested order line {0} does not exist")]
    OrderLineNotFound(i64),
    #[error("No payment transaction exists for reference {0}")]
    TransactionNotFound(String),
    #[error("Reported amount {reported} does not match the order total {expected}")]
    AmountMismatch { expected: Money, reported: Money },
    #[error("Transaction {0} was already processed; refusing to mutate a terminal state")]
    DuplicateProcessing(String),
    #[error("Illegal fulfilment transition: {0}")]
    IllegalStatusTransition(String),
    #[error("Operation not permitted: {0}")]
    PermissionDenied(String),
}

impl From<sqlx::Error> for PaymentGatewayError {
    fn from(e: sqlx::Error) -> Self {
        PaymentGatewayError::DatabaseError(e.to_string())
    }
}
