//! The payment gateway adapter.
//!
//! Two symmetric responsibilities: signing the outbound redirect URL that sends a buyer to the
//! gateway, and verifying the HMAC signature on everything the gateway sends back. Both sides
//! share one canonicalization rule, and it is a bit-exact interop contract: parameters sorted by
//! key (bytewise ascending), values URL-encoded, joined as `key=value` pairs with `&`. Empty
//! values are omitted from both the query string and the signature input. The signature is
//! HMAC-SHA512 over the canonical string, hex-encoded lowercase.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use mps_common::{Secret, CURRENCY_CODE};
use sha2::Sha512;

use crate::db_types::Order;

pub mod params {
    //! Wire names of the gateway's parameters.
    pub const VERSION: &str = "version";
    pub const COMMAND: &str = "command";
    pub const MERCHANT_CODE: &str = "merchant_code";
    pub const AMOUNT: &str = "amount";
    pub const CURRENCY: &str = "currency";
    pub const TRANSACTION_REF: &str = "transaction_ref";
    pub const ORDER_INFO: &str = "order_info";
    pub const ORDER_TYPE: &str = "order_type";
    pub const LOCALE: &str = "locale";
    pub const RETURN_URL: &str = "return_url";
    pub const CREATE_DATE: &str = "create_date";
    pub const EXPIRE_DATE: &str = "expire_date";
    pub const CLIENT_IP: &str = "client_ip";
    pub const BILL_MOBILE: &str = "bill_mobile";
    pub const BILL_NAME: &str = "bill_name";
    pub const RESPONSE_CODE: &str = "response_code";
    pub const EXTERNAL_TRANSACTION_NO: &str = "external_transaction_no";
    pub const SIGNATURE: &str = "signature";
    pub const SIGNATURE_TYPE: &str = "signature_type";
}

pub const PROTOCOL_VERSION: &str = "2.1.0";
pub const PAY_COMMAND: &str = "pay";
pub const ORDER_TYPE_VALUE: &str = "marketplace";
/// The gateway's response code for a successful payment.
pub const RESPONSE_CODE_SUCCESS: &str = "00";
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
const PAYMENT_WINDOW_MINUTES: i64 = 15;

/// Static configuration for the external gateway. The secret key never appears in logs.
#[derive(Clone, Debug, Default)]
pub struct GatewayConfig {
    /// Base URL of the gateway's payment page.
    pub payment_url: String,
    /// The merchant code the gateway issued to us.
    pub merchant_code: String,
    /// The shared HMAC secret.
    pub secret_key: Secret<String>,
    /// Where the gateway redirects the buyer's browser after payment.
    pub return_url: String,
    pub locale: String,
}

/// Builds the signed redirect URL for paying `order` at the gateway.
///
/// `now` is injected so the create/expire timestamps are deterministic under test; production
/// callers pass `Utc::now()`. The payment window closes [`PAYMENT_WINDOW_MINUTES`] after `now`.
pub fn build_payment_url(config: &GatewayConfig, order: &Order, client_ip: &str, now: DateTime<Utc>) -> String {
    let expiry = now + Duration::minutes(PAYMENT_WINDOW_MINUTES);
    let txref = order.id.as_transaction_ref();
    let mut p = BTreeMap::new();
    p.insert(params::VERSION, PROTOCOL_VERSION.to_string());
    p.insert(params::COMMAND, PAY_COMMAND.to_string());
    p.insert(params::MERCHANT_CODE, config.merchant_code.clone());
    p.insert(params::AMOUNT, order.total_price.value().to_string());
    p.insert(params::CURRENCY, CURRENCY_CODE.to_string());
    p.insert(params::TRANSACTION_REF, txref.clone());
    p.insert(params::ORDER_INFO, format!("Payment for order {txref}"));
    p.insert(params::ORDER_TYPE, ORDER_TYPE_VALUE.to_string());
    p.insert(params::LOCALE, config.locale.clone());
    p.insert(params::RETURN_URL, config.return_url.clone());
    p.insert(params::CREATE_DATE, now.format(TIMESTAMP_FORMAT).to_string());
    p.insert(params::EXPIRE_DATE, expiry.format(TIMESTAMP_FORMAT).to_string());
    p.insert(params::CLIENT_IP, client_ip.to_string());
    p.insert(params::BILL_MOBILE, order.phone_number.clone());
    p.insert(params::BILL_NAME, order.full_name.clone());

    let canonical = canonical_query(p.iter().map(|(k, v)| (*k, v.as_str())));
    let signature = sign(config.secret_key.reveal(), &canonical);
    format!("{}?{canonical}&{}={signature}", config.payment_url, params::SIGNATURE)
}

/// Verifies the signature on an inbound parameter set (callback or return redirect).
///
/// The signature and signature-type fields are stripped, the rest is re-canonicalized with the
/// identical rule, and the recomputed HMAC is compared against the received one. Returns `false`
/// for an empty parameter set, a missing signature, or any mismatch; malformed input is never an
/// error, just a failed verification.
pub fn verify_signature(received: &HashMap<String, String>, secret_key: &Secret<String>) -> bool {
    let Some(signature) = received.get(params::SIGNATURE) else {
        return false;
    };
    let unsigned: BTreeMap<&str, &str> = received
        .iter()
        .filter(|(k, _)| k.as_str() != params::SIGNATURE && k.as_str() != params::SIGNATURE_TYPE)
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    if unsigned.is_empty() {
        return false;
    }
    let canonical = canonical_query(unsigned.into_iter());
    let expected = sign(secret_key.reveal(), &canonical);
    // The hex alphabet is fixed, so a byte-wise comparison of equal-length strings leaks nothing
    // useful; mismatched lengths fail immediately.
    constant_time_eq(signature.as_bytes(), expected.as_bytes())
}

/// Applies the canonicalization rule to pre-sorted `(key, value)` pairs: empty values dropped,
/// values URL-encoded, `key=value` pairs joined with `&`.
fn canonical_query<'a>(sorted_pairs: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    sorted_pairs
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// HMAC-SHA512 over `data`, hex-encoded lowercase.
fn sign(secret_key: &str, data: &str) -> String {
    let mut mac = Hmac::<Sha512>::new_from_slice(secret_key.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(data.as_bytes());
    mac.finalize().into_bytes().iter().fold(String::with_capacity(128), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;
    use mps_common::Money;

    use super::*;
    use crate::db_types::{OrderId, PaymentMethod};

    fn config() -> GatewayConfig {
        GatewayConfig {
            payment_url: "https://gateway.example.com/pay".to_string(),
            merchant_code: "MERCH01".to_string(),
            secret_key: Secret::new("topsecretkey".to_string()),
            return_url: "https://shop.example.com/payment/return".to_string(),
            locale: "vn".to_string(),
        }
    }

    fn order() -> Order {
        Order {
            id: OrderId(42),
            user_id: 7,
            total_price: Money::from_major_units(240_000),
            payment_method: PaymentMethod::OnlineGateway,
            full_name: "Alex Tran".to_string(),
            phone_number: "0901234567".to_string(),
            address: "12 Market St".to_string(),
            note: None,
            created_at: Utc::now(),
        }
    }

    fn params_of(url: &str) -> HashMap<String, String> {
        let query = url.split_once('?').unwrap().1;
        query
            .split('&')
            .map(|pair| {
                let (k, v) = pair.split_once('=').unwrap();
                (k.to_string(), urlencoding::decode(v).unwrap().into_owned())
            })
            .collect()
    }

    #[test]
    fn payment_url_round_trips_through_verification() {
        let cfg = config();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 10, 30, 0).unwrap();
        let url = build_payment_url(&cfg, &order(), "203.0.113.9", now);
        assert!(url.starts_with("https://gateway.example.com/pay?"));

        let received = params_of(&url);
        assert_eq!(received.get(params::AMOUNT).unwrap(), "24000000");
        assert_eq!(received.get(params::TRANSACTION_REF).unwrap(), "42");
        assert_eq!(received.get(params::CREATE_DATE).unwrap(), "20240601103000");
        assert_eq!(received.get(params::EXPIRE_DATE).unwrap(), "20240601104500");
        assert!(verify_signature(&received, &cfg.secret_key));
    }

    #[test]
    fn tampering_with_any_value_breaks_the_signature() {
        let cfg = config();
        let url = build_payment_url(&cfg, &order(), "203.0.113.9", Utc::now());
        let mut received = params_of(&url);
        received.insert(params::AMOUNT.to_string(), "24000001".to_string());
        assert!(!verify_signature(&received, &cfg.secret_key));
    }

    #[test]
    fn flipping_one_signature_character_fails() {
        let cfg = config();
        let url = build_payment_url(&cfg, &order(), "203.0.113.9", Utc::now());
        let mut received = params_of(&url);
        let sig = received.get(params::SIGNATURE).unwrap().clone();
        let flipped = if sig.starts_with('0') { format!("1{}", &sig[1..]) } else { format!("0{}", &sig[1..]) };
        received.insert(params::SIGNATURE.to_string(), flipped);
        assert!(!verify_signature(&received, &cfg.secret_key));
    }

    #[test]
    fn wrong_secret_fails() {
        let cfg = config();
        let url = build_payment_url(&cfg, &order(), "203.0.113.9", Utc::now());
        let received = params_of(&url);
        assert!(!verify_signature(&received, &Secret::new("wrongkey".to_string())));
    }

    #[test]
    fn missing_signature_or_empty_set_fails_closed() {
        let cfg = config();
        assert!(!verify_signature(&HashMap::new(), &cfg.secret_key));

        let mut only_sig = HashMap::new();
        only_sig.insert(params::SIGNATURE.to_string(), "deadbeef".to_string());
        assert!(!verify_signature(&only_sig, &cfg.secret_key));
    }

    #[test]
    fn canonical_form_sorts_keys_encodes_values_and_drops_empties() {
        let pairs = [("b", "two words"), ("a", "1"), ("c", ""), ("d", "x&y=z")];
        let mut sorted: Vec<_> = pairs.to_vec();
        sorted.sort_by_key(|(k, _)| *k);
        let canonical = canonical_query(sorted.into_iter());
        assert_eq!(canonical, "a=1&b=two%20words&d=x%26y%3Dz");
    }

    #[test]
    fn signature_type_field_is_excluded_from_verification() {
        let cfg = config();
        let url = build_payment_url(&cfg, &order(), "203.0.113.9", Utc::now());
        let mut received = params_of(&url);
        received.insert(params::SIGNATURE_TYPE.to_string(), "HMACSHA512".to_string());
        assert!(verify_signature(&received, &cfg.secret_key));
    }

    #[test]
    fn signature_is_lowercase_hex_sha512() {
        let sig = sign("key", "a=1&b=2");
        assert_eq!(sig.len(), 128);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
