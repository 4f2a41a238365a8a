//! Marketplace Payment Engine
//!
//! The engine holds the order-settlement and payment-confirmation core of the marketplace: it
//! converts a shopping cart into a persisted, priced, stock-reserved order in a single atomic
//! transaction, and reconciles that order against the signature-authenticated callbacks of an
//! external payment gateway.
//!
//! The library is divided into three main sections:
//! 1. Database management ([`mod@sqlite`]). Low-level access is plain async functions taking a
//!    `&mut SqliteConnection`, so callers decide the transaction boundary. You should never need
//!    to touch these directly; use the public APIs instead. The record types live in
//!    [`mod@db_types`] and are public.
//! 2. The backend traits ([`mod@traits`]). A storage backend implements these to drive the order
//!    flow and the reconciliation state machine. [`SqliteDatabase`] is the provided
//!    implementation.
//! 3. The public APIs ([`OrderFlowApi`] and [`PaymentGatewayApi`]) plus the pure components:
//!    the pricing engine ([`mod@pricing`]) and the gateway adapter ([`mod@gateway`]) that signs
//!    outbound payment URLs and verifies inbound callback signatures.

mod api;
pub mod db_types;
pub mod gateway;
pub mod pricing;
mod sqlite;
pub mod traits;

pub mod test_utils;

pub use api::{
    order_flow_api::OrderFlowApi,
    payment_api::{CallbackOutcome, PaymentGatewayApi, ReturnOutcome},
};
pub use sqlite::SqliteDatabase;
