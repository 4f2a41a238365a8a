use std::fmt::Display;

use marketplace_payment_engine::{
    db_types::{FulfilmentStatus, LineItemRequest, OrderId, PaymentMethod, ShippingInfo},
    CallbackOutcome,
    ReturnOutcome,
};
use mps_common::Money;
use serde::{Deserialize, Serialize};

/// The checkout request body. The actor comes from the `X-User-Id` header, never the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub payment_type: PaymentMethod,
    #[serde(flatten)]
    pub shipping: ShippingInfo,
    pub items: Vec<LineItemRequest>,
}

/// The checkout response for online-gateway orders: where to send the buyer's browser.
/// Cash-on-delivery checkouts return the persisted order aggregate instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub order_id: OrderId,
    pub payment_type: PaymentMethod,
    pub total_price: Money,
    /// The signed gateway redirect URL.
    pub payment_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineStatusUpdate {
    pub status: FulfilmentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// The acknowledgement body the gateway expects from the IPN endpoint. Always delivered with
/// HTTP 200; the `response_code` carries the actual outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpnResponse {
    pub response_code: String,
    pub message: String,
}

impl IpnResponse {
    fn new(response_code: &str, message: &str) -> Self {
        Self { response_code: response_code.to_string(), message: message.to_string() }
    }
}

impl From<&CallbackOutcome> for IpnResponse {
    fn from(outcome: &CallbackOutcome) -> Self {
        match outcome {
            // A failed payment is still a successfully received notification.
            CallbackOutcome::Confirmed | CallbackOutcome::PaymentFailed => Self::new("00", "Confirm Success"),
            CallbackOutcome::NotFound => Self::new("01", "Order not found"),
            CallbackOutcome::AlreadyProcessed => Self::new("02", "Order already confirmed"),
            CallbackOutcome::AmountMismatch => Self::new("04", "Invalid amount"),
            CallbackOutcome::BadChecksum => Self::new("97", "Invalid signature"),
            CallbackOutcome::InvalidRequest => Self::new("99", "Invalid request"),
            CallbackOutcome::InternalError => Self::new("99", "Unknown error"),
        }
    }
}

/// What the buyer's browser sees when the gateway redirects it back to us. `data` echoes the
/// verified parameters back for display; it is absent when verification failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnResponse {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<std::collections::HashMap<String, String>>,
}

impl From<&ReturnOutcome> for ReturnResponse {
    fn from(outcome: &ReturnOutcome) -> Self {
        let (status, message) = match outcome {
            ReturnOutcome::Success => ("success", "Payment successful"),
            ReturnOutcome::Failed => ("failed", "Payment failed or was cancelled"),
            ReturnOutcome::TamperedData => ("error", "Invalid signature. The data may have been tampered with"),
            ReturnOutcome::InvalidRequest => ("error", "Invalid request"),
        };
        Self { status: status.to_string(), message: message.to_string(), data: None }
    }
}
