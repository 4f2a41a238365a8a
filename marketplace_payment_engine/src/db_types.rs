//! Record and value types shared between the storage layer and the public APIs.

use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use mps_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------        OrderId        -------------------------------------------------------
/// The order's database identifier. Rendered as text, it doubles as the internal transaction
/// reference sent to the payment gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub i64);

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<i64> for OrderId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl OrderId {
    /// The external-facing transaction reference for this order.
    pub fn as_transaction_ref(&self) -> String {
        self.0.to_string()
    }
}

//--------------------------------------         Shop          -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Shop {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------        Product        -------------------------------------------------------
/// A catalog product. The product is itself a stock unit: it carries its own available quantity
/// and base price. Variants, when present, track their own stock and price.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub shop_id: i64,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub quantity: i64,
    pub discount_percent: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: i64,
    pub product_id: i64,
    pub price: Money,
    pub quantity: i64,
    /// Opaque attribute map (e.g. size/colour), stored as JSON text.
    pub attributes: String,
}

//--------------------------------------      Stock units      -------------------------------------------------------
/// Identifies one of the two kinds of stock unit the inventory ledger operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockUnitId {
    Product(i64),
    Variant(i64),
}

impl Display for StockUnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockUnitId::Product(id) => write!(f, "product {id}"),
            StockUnitId::Variant(id) => write!(f, "variant {id}"),
        }
    }
}

//--------------------------------------    Payment method     -------------------------------------------------------
/// How the buyer chose to pay. Set once at order creation and never re-derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "COD")]
    Cod,
    #[serde(rename = "ONLINE_GATEWAY")]
    OnlineGateway,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Cod => write!(f, "COD"),
            PaymentMethod::OnlineGateway => write!(f, "ONLINE_GATEWAY"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COD" | "Cod" => Ok(Self::Cod),
            "ONLINE_GATEWAY" | "OnlineGateway" => Ok(Self::OnlineGateway),
            s => Err(ConversionError(format!("Invalid payment method: {s}"))),
        }
    }
}

//--------------------------------------  Fulfilment status    -------------------------------------------------------
/// Shop-controlled, forward-only progress of a single order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum FulfilmentStatus {
    Pending,
    Confirmed,
    Shipped,
}

impl FulfilmentStatus {
    /// Transitions must move strictly forward along Pending -> Confirmed -> Shipped.
    pub fn can_advance_to(&self, next: FulfilmentStatus) -> bool {
        (next as u8) == (*self as u8) + 1
    }
}

impl Display for FulfilmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FulfilmentStatus::Pending => write!(f, "Pending"),
            FulfilmentStatus::Confirmed => write!(f, "Confirmed"),
            FulfilmentStatus::Shipped => write!(f, "Shipped"),
        }
    }
}

impl FromStr for FulfilmentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Confirmed" => Ok(Self::Confirmed),
            "Shipped" => Ok(Self::Shipped),
            s => Err(ConversionError(format!("Invalid fulfilment status: {s}"))),
        }
    }
}

//--------------------------------------  Line payment status  -------------------------------------------------------
/// Gateway-controlled payment state of a single order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum LinePaymentStatus {
    Pending,
    Paid,
}

impl Display for LinePaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinePaymentStatus::Pending => write!(f, "Pending"),
            LinePaymentStatus::Paid => write!(f, "Paid"),
        }
    }
}

//-------------------------------------- Transaction status    -------------------------------------------------------
/// Lifecycle of a gateway payment attempt. `Success` and `Failed` are terminal; the
/// reconciliation state machine refuses any transition out of a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "Pending"),
            TransactionStatus::Success => write!(f, "Success"),
            TransactionStatus::Failed => write!(f, "Failed"),
        }
    }
}

//--------------------------------------        Order          -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: i64,
    /// Always equals the sum of the line totals as of the last successful mutation.
    pub total_price: Money,
    pub payment_method: PaymentMethod,
    pub full_name: String,
    pub phone_number: String,
    pub address: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: OrderId,
    pub product_id: i64,
    pub variant_id: Option<i64>,
    /// Captured from the product at creation time so the line survives product re-assignment.
    pub shop_id: i64,
    pub quantity: i64,
    /// The stored line total: unit price x quantity x discount factor. Immutable.
    pub price: Money,
    pub fulfilment_status: FulfilmentStatus,
    pub payment_status: LinePaymentStatus,
}

/// An order together with everything created alongside it: its lines, and the pending payment
/// transaction when the buyer chose the online gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderLine>,
    pub payment: Option<PaymentTransaction>,
}

//--------------------------------------     New order         -------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub full_name: String,
    pub phone_number: String,
    pub address: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// One requested cart line: a product, an optional SKU-level variant, and a quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemRequest {
    pub product_id: i64,
    #[serde(default)]
    pub variant_id: Option<i64>,
    pub quantity: i64,
}

/// A checkout request, ready for the order aggregate builder. The actor is explicit; nothing in
/// the engine reaches for ambient request state.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: i64,
    pub payment_method: PaymentMethod,
    pub shipping: ShippingInfo,
    pub items: Vec<LineItemRequest>,
}

impl NewOrder {
    pub fn new(user_id: i64, payment_method: PaymentMethod, shipping: ShippingInfo) -> Self {
        Self { user_id, payment_method, shipping, items: Vec::new() }
    }

    pub fn with_item(mut self, product_id: i64, variant_id: Option<i64>, quantity: i64) -> Self {
        self.items.push(LineItemRequest { product_id, variant_id, quantity });
        self
    }
}

//-------------------------------------- Payment transaction   -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: i64,
    pub order_id: OrderId,
    /// Always equals the order total at creation time.
    pub amount: Money,
    /// The reference we generate and hand to the gateway; the join key for callbacks.
    pub transaction_ref: String,
    /// The reference the gateway assigns. Audit only, never a lookup key.
    pub external_ref: Option<String>,
    pub status: TransactionStatus,
    pub payment_source: String,
    /// The raw callback payload, stored verbatim for audit.
    pub raw_response: Option<String>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------     Compensation      -------------------------------------------------------
/// Result of the compensating transaction that rejects an order line: the order either survives
/// with a recomputed total, or is deleted because no lines remain.
#[derive(Debug, Clone)]
pub enum CompensationOutcome {
    OrderUpdated(Order),
    OrderDeleted(OrderId),
}
