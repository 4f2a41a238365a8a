use std::{collections::HashMap, fmt::Debug};

use chrono::Utc;
use log::*;
use mps_common::Money;

use crate::{
    db_types::{Order, PaymentTransaction},
    gateway,
    gateway::{params, GatewayConfig, RESPONSE_CODE_SUCCESS},
    traits::{PaymentGatewayDatabase, PaymentGatewayError, Settlement},
};

/// The result of processing one gateway callback. Every branch is distinguishable because the
/// gateway inspects our response to decide whether to retry the notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The payment was confirmed and the order's lines are now paid.
    Confirmed,
    /// The gateway reported a failed/abandoned payment; recorded, no retry wanted.
    PaymentFailed,
    /// The signature did not verify. Nothing was looked up, nothing mutated.
    BadChecksum,
    /// No order/transaction matches the callback's transaction reference.
    NotFound,
    /// The reported amount disagrees with the order total. Nothing mutated.
    AmountMismatch,
    /// The transaction already reached a terminal state; the first callback won.
    AlreadyProcessed,
    /// The parameter set was empty or missing required fields.
    InvalidRequest,
    /// A local persistence failure. The gateway may retry later.
    InternalError,
}

/// The result of verifying a return redirect. Strictly informational; the return path never
/// mutates order or payment state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnOutcome {
    Success,
    Failed,
    /// Signature verification failed: the data may have been tampered with in transit.
    TamperedData,
    InvalidRequest,
}

/// `PaymentGatewayApi` drives the payment half of the flow: building signed redirect URLs for
/// freshly created orders, and running the reconciliation state machine over the gateway's
/// callback and return notifications.
pub struct PaymentGatewayApi<B> {
    db: B,
    config: GatewayConfig,
}

impl<B> Debug for PaymentGatewayApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentGatewayApi")
    }
}

impl<B> PaymentGatewayApi<B> {
    pub fn new(db: B, config: GatewayConfig) -> Self {
        Self { db, config }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The signed redirect URL sending the buyer to the gateway to pay for `order`.
    pub fn payment_url_for(&self, order: &Order, client_ip: &str) -> String {
        gateway::build_payment_url(&self.config, order, client_ip, Utc::now())
    }

    /// Verifies the browser-redirect parameters and reports the outcome to show the user.
    ///
    /// Deliberately read-only: the redirect is not guaranteed to arrive and travels through the
    /// buyer's browser, so the authoritative state transition belongs to the callback path alone.
    pub fn verify_return(&self, received: &HashMap<String, String>) -> ReturnOutcome {
        if received.is_empty() {
            return ReturnOutcome::InvalidRequest;
        }
        if !gateway::verify_signature(received, &self.config.secret_key) {
            warn!("🔁️ Return redirect failed signature verification");
            return ReturnOutcome::TamperedData;
        }
        match received.get(params::RESPONSE_CODE).map(String::as_str) {
            Some(RESPONSE_CODE_SUCCESS) => ReturnOutcome::Success,
            Some(_) => ReturnOutcome::Failed,
            None => ReturnOutcome::InvalidRequest,
        }
    }
}

impl<B> PaymentGatewayApi<B>
where B: PaymentGatewayDatabase
{
    /// Processes a server-to-server callback notification.
    ///
    /// The checks run in a fixed order: signature, lookup, amount, idempotency, and only then
    /// the terminal transition — with the idempotency check and the mutation inside one store
    /// transaction, so concurrent duplicates cannot both win. Errors never escape; they map to
    /// a distinct [`CallbackOutcome`] the HTTP layer translates for the gateway.
    pub async fn process_callback(&self, received: &HashMap<String, String>) -> CallbackOutcome {
        if received.is_empty() {
            return CallbackOutcome::InvalidRequest;
        }
        if !gateway::verify_signature(received, &self.config.secret_key) {
            warn!("🔔️ Callback failed signature verification");
            return CallbackOutcome::BadChecksum;
        }
        let Some(transaction_ref) = received.get(params::TRANSACTION_REF) else {
            return CallbackOutcome::InvalidRequest;
        };
        let Some(reported_amount) = received.get(params::AMOUNT).and_then(|a| a.parse::<i64>().ok()) else {
            return CallbackOutcome::InvalidRequest;
        };
        let Some(response_code) = received.get(params::RESPONSE_CODE) else {
            return CallbackOutcome::InvalidRequest;
        };
        let settlement = if response_code == RESPONSE_CODE_SUCCESS {
            Settlement::Success { external_ref: received.get(params::EXTERNAL_TRANSACTION_NO).cloned() }
        } else {
            debug!("🔔️ Gateway reported failure code {response_code} for [{transaction_ref}]");
            Settlement::Failure
        };
        // The payload is stored verbatim for audit regardless of outcome.
        let raw_payload = serde_json::to_string(received).unwrap_or_default();
        let settled_as_success = settlement.is_success();
        let result = self
            .db
            .settle_transaction(transaction_ref, Money::from_minor_units(reported_amount), settlement, raw_payload)
            .await;
        match result {
            Ok(tx) => {
                info!("🔔️ Callback for [{}] settled; status {}", tx.transaction_ref, tx.status);
                if settled_as_success {
                    CallbackOutcome::Confirmed
                } else {
                    CallbackOutcome::PaymentFailed
                }
            },
            Err(PaymentGatewayError::TransactionNotFound(_)) | Err(PaymentGatewayError::OrderNotFound(_)) => {
                info!("🔔️ Callback for unknown transaction [{transaction_ref}]");
                CallbackOutcome::NotFound
            },
            Err(PaymentGatewayError::AmountMismatch { expected, reported }) => {
                warn!("🔔️ Callback amount {reported} does not match order total {expected} for [{transaction_ref}]");
                CallbackOutcome::AmountMismatch
            },
            Err(PaymentGatewayError::DuplicateProcessing(_)) => {
                info!("🔔️ Callback for [{transaction_ref}] arrived after the transaction was already settled");
                CallbackOutcome::AlreadyProcessed
            },
            Err(e) => {
                error!("🔔️ Could not settle transaction [{transaction_ref}]: {e}");
                CallbackOutcome::InternalError
            },
        }
    }

    /// Fetches the payment transaction for an order's internal reference, if one exists.
    pub async fn transaction_for(&self, transaction_ref: &str) -> Result<Option<PaymentTransaction>, PaymentGatewayError> {
        self.db.fetch_transaction_by_ref(transaction_ref).await
    }
}
