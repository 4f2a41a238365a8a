//! Callback reconciliation tests: the signed notification path from the gateway back to us.

use std::collections::{BTreeMap, HashMap};

use hmac::{Hmac, Mac};
use marketplace_payment_engine::{
    db_types::{LinePaymentStatus, OrderWithItems, PaymentMethod, ShippingInfo, TransactionStatus},
    gateway::{params, GatewayConfig},
    test_utils::{prepare_test_env, random_db_path, seed_product, seed_shop},
    traits::OrderManagement,
    CallbackOutcome,
    OrderFlowApi,
    PaymentGatewayApi,
    ReturnOutcome,
    SqliteDatabase,
};
use mps_common::{Money, Secret};
use sha2::Sha512;

const BUYER: i64 = 7;
const SECRET: &str = "reconciliation-test-secret";

fn gateway_config() -> GatewayConfig {
    GatewayConfig {
        payment_url: "https://gateway.example.com/pay".to_string(),
        merchant_code: "MERCH01".to_string(),
        secret_key: Secret::new(SECRET.to_string()),
        return_url: "https://shop.example.com/payment/return".to_string(),
        locale: "vn".to_string(),
    }
}

/// Signs a parameter set the way the gateway does: keys sorted, empty values dropped, values
/// URL-encoded, HMAC-SHA512 in lowercase hex. Computed independently of the engine's own signer.
fn signed(pairs: &[(&str, String)]) -> HashMap<String, String> {
    let sorted: BTreeMap<&str, &str> = pairs.iter().map(|(k, v)| (*k, v.as_str())).collect();
    let canonical = sorted
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    let mut mac = Hmac::<Sha512>::new_from_slice(SECRET.as_bytes()).unwrap();
    mac.update(canonical.as_bytes());
    let signature = mac.finalize().into_bytes().iter().map(|b| format!("{b:02x}")).collect::<String>();
    let mut map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
    map.insert(params::SIGNATURE.to_string(), signature);
    map
}

fn callback_for(order: &OrderWithItems, response_code: &str) -> HashMap<String, String> {
    signed(&[
        (params::TRANSACTION_REF, order.payment.as_ref().unwrap().transaction_ref.clone()),
        (params::AMOUNT, order.order.total_price.value().to_string()),
        (params::RESPONSE_CODE, response_code.to_string()),
        (params::EXTERNAL_TRANSACTION_NO, "GW-88421".to_string()),
    ])
}

async fn checkout() -> (SqliteDatabase, PaymentGatewayApi<SqliteDatabase>, OrderWithItems) {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    let shop = seed_shop(&db, "Rosie's", 100).await;
    let product = seed_product(&db, shop.id, "Lamp", Money::from_major_units(100_000), 5, 0).await;
    let orders = OrderFlowApi::new(db.clone());
    let shipping = ShippingInfo {
        full_name: "Alex Tran".to_string(),
        phone_number: "0901234567".to_string(),
        address: "12 Market St".to_string(),
        note: None,
    };
    let placed = orders
        .place_order(
            BUYER,
            PaymentMethod::OnlineGateway,
            shipping,
            vec![marketplace_payment_engine::db_types::LineItemRequest { product_id: product.id, variant_id: None, quantity: 2 }],
        )
        .await
        .expect("Error placing order");
    let payments = PaymentGatewayApi::new(db.clone(), gateway_config());
    (db, payments, placed)
}

async fn transaction_status(db: &SqliteDatabase, order: &OrderWithItems) -> TransactionStatus {
    db.fetch_transaction_by_ref(&order.payment.as_ref().unwrap().transaction_ref)
        .await
        .unwrap()
        .expect("Transaction should exist")
        .status
}

#[tokio::test]
async fn successful_callback_confirms_the_payment_once() {
    let (db, payments, order) = checkout().await;
    let callback = callback_for(&order, "00");

    assert_eq!(payments.process_callback(&callback).await, CallbackOutcome::Confirmed);

    let settled = db.fetch_order(order.order.id).await.unwrap().unwrap();
    assert!(settled.items.iter().all(|l| l.payment_status == LinePaymentStatus::Paid));
    let payment = settled.payment.unwrap();
    assert_eq!(payment.status, TransactionStatus::Success);
    assert_eq!(payment.external_ref.as_deref(), Some("GW-88421"));
    assert!(payment.raw_response.is_some());

    // The retry of the same notification confirms nothing further.
    assert_eq!(payments.process_callback(&callback).await, CallbackOutcome::AlreadyProcessed);
    assert_eq!(transaction_status(&db, &order).await, TransactionStatus::Success);
}

#[tokio::test]
async fn failed_payment_is_terminal_too() {
    let (db, payments, order) = checkout().await;

    let failed = callback_for(&order, "24");
    assert_eq!(payments.process_callback(&failed).await, CallbackOutcome::PaymentFailed);
    assert_eq!(transaction_status(&db, &order).await, TransactionStatus::Failed);
    let settled = db.fetch_order(order.order.id).await.unwrap().unwrap();
    assert!(settled.items.iter().all(|l| l.payment_status == LinePaymentStatus::Pending));

    // A success notification arriving after the failure cannot resurrect the transaction.
    let success = callback_for(&order, "00");
    assert_eq!(payments.process_callback(&success).await, CallbackOutcome::AlreadyProcessed);
    assert_eq!(transaction_status(&db, &order).await, TransactionStatus::Failed);
}

#[tokio::test]
async fn amount_mismatch_mutates_nothing() {
    let (db, payments, order) = checkout().await;
    let reported = order.order.total_price.value() + 1;
    let callback = signed(&[
        (params::TRANSACTION_REF, order.payment.as_ref().unwrap().transaction_ref.clone()),
        (params::AMOUNT, reported.to_string()),
        (params::RESPONSE_CODE, "00".to_string()),
    ]);

    assert_eq!(payments.process_callback(&callback).await, CallbackOutcome::AmountMismatch);
    assert_eq!(transaction_status(&db, &order).await, TransactionStatus::Pending);
    let detail = db.fetch_order(order.order.id).await.unwrap().unwrap();
    assert!(detail.items.iter().all(|l| l.payment_status == LinePaymentStatus::Pending));
}

#[tokio::test]
async fn tampered_callback_is_rejected_before_any_lookup() {
    let (db, payments, order) = checkout().await;
    let mut callback = callback_for(&order, "00");
    callback.insert(params::AMOUNT.to_string(), (order.order.total_price.value() * 2).to_string());

    assert_eq!(payments.process_callback(&callback).await, CallbackOutcome::BadChecksum);
    assert_eq!(transaction_status(&db, &order).await, TransactionStatus::Pending);
}

#[tokio::test]
async fn unknown_transaction_reference_reports_not_found() {
    let (_db, payments, _order) = checkout().await;
    let callback = signed(&[
        (params::TRANSACTION_REF, "424242".to_string()),
        (params::AMOUNT, "100".to_string()),
        (params::RESPONSE_CODE, "00".to_string()),
    ]);
    assert_eq!(payments.process_callback(&callback).await, CallbackOutcome::NotFound);
}

#[tokio::test]
async fn malformed_callbacks_are_invalid_requests() {
    let (_db, payments, order) = checkout().await;

    assert_eq!(payments.process_callback(&HashMap::new()).await, CallbackOutcome::InvalidRequest);

    // Signed, but the amount is not a number.
    let callback = signed(&[
        (params::TRANSACTION_REF, order.payment.as_ref().unwrap().transaction_ref.clone()),
        (params::AMOUNT, "one million".to_string()),
        (params::RESPONSE_CODE, "00".to_string()),
    ]);
    assert_eq!(payments.process_callback(&callback).await, CallbackOutcome::InvalidRequest);

    // Signed, but no response code at all.
    let callback = signed(&[
        (params::TRANSACTION_REF, order.payment.as_ref().unwrap().transaction_ref.clone()),
        (params::AMOUNT, order.order.total_price.value().to_string()),
    ]);
    assert_eq!(payments.process_callback(&callback).await, CallbackOutcome::InvalidRequest);
}

#[tokio::test]
async fn return_redirect_verifies_but_never_mutates() {
    let (db, payments, order) = checkout().await;

    let ret = callback_for(&order, "00");
    assert_eq!(payments.verify_return(&ret), ReturnOutcome::Success);
    // Informational only: the transaction is still pending until the callback lands.
    assert_eq!(transaction_status(&db, &order).await, TransactionStatus::Pending);

    let ret = callback_for(&order, "24");
    assert_eq!(payments.verify_return(&ret), ReturnOutcome::Failed);

    let mut tampered = callback_for(&order, "00");
    tampered.insert(params::AMOUNT.to_string(), "1".to_string());
    assert_eq!(payments.verify_return(&tampered), ReturnOutcome::TamperedData);

    assert_eq!(payments.verify_return(&HashMap::new()), ReturnOutcome::InvalidRequest);
}

#[tokio::test]
async fn payment_url_signature_survives_the_query_string_round_trip() {
    let (_db, payments, order) = checkout().await;
    let url = payments.payment_url_for(&order.order, "203.0.113.9");
    let received: HashMap<String, String> = url
        .split_once('?')
        .unwrap()
        .1
        .split('&')
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap();
            (k.to_string(), urlencoding::decode(v).unwrap().into_owned())
        })
        .collect();
    assert_eq!(received.get(params::AMOUNT).unwrap(), &order.order.total_price.value().to_string());
    assert_eq!(
        received.get(params::TRANSACTION_REF).unwrap(),
        &order.payment.as_ref().unwrap().transaction_ref
    );
    assert!(marketplace_payment_engine::gateway::verify_signature(&received, &Secret::new(SECRET.to_string())));
}
