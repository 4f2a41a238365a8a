//! # Marketplace payment server
//!
//! The HTTP front-end for the marketplace payment engine. It is responsible for:
//! * Accepting checkout requests and turning them into settled orders.
//! * Handing buyers a signed redirect URL to the external payment gateway.
//! * Listening for the gateway's server-to-server callback (IPN) and browser return redirects.
//! * The shop-side order line endpoints (fulfilment updates and rejections).
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Identity
//! The server sits behind a reverse proxy that authenticates users and injects the `X-User-Id`
//! header. Requests on `/api` without that header are rejected; `/gateway` endpoints are
//! authenticated by the HMAC signature on their parameters instead.

pub mod config;
pub mod data_objects;
pub mod errors;
pub mod gateway_routes;
pub mod helpers;
pub mod routes;
pub mod server;
