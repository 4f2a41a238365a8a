//! Traits a storage backend must implement to power the engine.
//!
//! The split mirrors the two halves of the core: [`OrderManagement`] covers reads, while
//! [`PaymentGatewayDatabase`] adds the write-side flows (the order aggregate builder, the
//! compensating rejection, and the reconciliation state machine's terminal transition).

mod data_objects;
mod order_management;
mod payment_gateway_database;

pub use data_objects::Settlement;
pub use order_management::OrderManagement;
pub use payment_gateway_database::{PaymentGatewayDatabase, PaymentGatewayError};
