//! Handlers for the payment gateway's inbound traffic.
//!
//! Two endpoints, with very different trust models:
//! * `/gateway/ipn` is the server-to-server callback (IPN). It is the authoritative notification
//!   and always answers HTTP 200; the JSON `response_code` tells the gateway whether to retry.
//! * `/gateway/return` is the buyer's browser coming back from the gateway. It is informational
//!   only and never changes order or payment state.
//!
//! Neither endpoint uses the `X-User-Id` header; the HMAC signature on the query parameters is
//! the authentication.

use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use log::*;
use marketplace_payment_engine::{gateway::params, traits::PaymentGatewayDatabase, PaymentGatewayApi, ReturnOutcome};

use crate::{
    data_objects::{IpnResponse, ReturnResponse},
    route,
};

route!(gateway_ipn => Get "/ipn" impl PaymentGatewayDatabase);
/// Route handler for the gateway's instant payment notification.
///
/// Every branch answers HTTP 200. A non-200 response would make the gateway retry notifications
/// we have already conclusively handled; the `response_code` in the body carries the outcome
/// instead.
pub async fn gateway_ipn<B: PaymentGatewayDatabase>(
    query: web::Query<HashMap<String, String>>,
    payments: web::Data<PaymentGatewayApi<B>>,
) -> HttpResponse {
    trace!("🔔️ Received gateway IPN callback");
    let outcome = payments.process_callback(&query.into_inner()).await;
    let response = IpnResponse::from(&outcome);
    info!("🔔️ IPN handled: {outcome:?} -> response code {}", response.response_code);
    HttpResponse::Ok().json(response)
}

route!(gateway_return => Get "/return" impl PaymentGatewayDatabase);
/// Route handler for the browser redirect back from the gateway.
///
/// Verifies the signature and reports the result for display. The transaction itself is settled
/// by the IPN callback alone, so this handler performs no writes.
pub async fn gateway_return<B: PaymentGatewayDatabase>(
    query: web::Query<HashMap<String, String>>,
    payments: web::Data<PaymentGatewayApi<B>>,
) -> HttpResponse {
    trace!("🔁️ Received gateway return redirect");
    let mut received = query.into_inner();
    let outcome = payments.verify_return(&received);
    let mut response = ReturnResponse::from(&outcome);
    if matches!(outcome, ReturnOutcome::Success | ReturnOutcome::Failed) {
        received.remove(params::SIGNATURE);
        received.remove(params::SIGNATURE_TYPE);
        response.data = Some(received);
    }
    HttpResponse::Ok().json(response)
}
