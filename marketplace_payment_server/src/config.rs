use std::env;

use log::*;
use marketplace_payment_engine::gateway::GatewayConfig;
use mps_common::Secret;

const DEFAULT_MPS_HOST: &str = "127.0.0.1";
const DEFAULT_MPS_PORT: u16 = 8360;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    /// Payment gateway credentials and endpoints.
    pub gateway: GatewayConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MPS_HOST.to_string(),
            port: DEFAULT_MPS_PORT,
            database_url: String::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            gateway: GatewayConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("MPS_HOST").ok().unwrap_or_else(|| DEFAULT_MPS_HOST.into());
        let port = env::var("MPS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for MPS_PORT. {e} Using the default, {DEFAULT_MPS_PORT}, instead."
                    );
                    DEFAULT_MPS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_MPS_PORT);
        let database_url = env::var("MPS_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ MPS_DATABASE_URL is not set. Please set it to the URL for the marketplace database.");
            String::default()
        });
        let use_x_forwarded_for =
            env::var("MPS_USE_X_FORWARDED_FOR").map(|s| &s == "1" || &s == "true").unwrap_or(false);
        let use_forwarded = env::var("MPS_USE_FORWARDED").map(|s| &s == "1" || &s == "true").unwrap_or(false);
        let gateway = gateway_config_from_env();
        Self { host, port, database_url, use_x_forwarded_for, use_forwarded, gateway }
    }
}

fn gateway_config_from_env() -> GatewayConfig {
    let payment_url = env::var("MPS_GATEWAY_PAYMENT_URL").ok().unwrap_or_else(|| {
        error!("🪛️ MPS_GATEWAY_PAYMENT_URL is not set. Buyers cannot be redirected to the gateway.");
        String::default()
    });
    let merchant_code = env::var("MPS_GATEWAY_MERCHANT_CODE").ok().unwrap_or_else(|| {
        error!("🪛️ MPS_GATEWAY_MERCHANT_CODE is not set. Please set it to your merchant code.");
        String::default()
    });
    let secret_key = env::var("MPS_GATEWAY_SECRET_KEY").ok().unwrap_or_else(|| {
        error!(
            "🚨️ MPS_GATEWAY_SECRET_KEY is not set. Signature verification will reject every callback. Set it to \
             the HMAC secret the gateway issued to you."
        );
        String::default()
    });
    let return_url = env::var("MPS_GATEWAY_RETURN_URL").ok().unwrap_or_else(|| {
        error!("🪛️ MPS_GATEWAY_RETURN_URL is not set. Please set it to the public URL of the return endpoint.");
        String::default()
    });
    let locale = env::var("MPS_GATEWAY_LOCALE").ok().unwrap_or_else(|| {
        info!("🪛️ MPS_GATEWAY_LOCALE is not set. Using 'vn'.");
        "vn".to_string()
    });
    GatewayConfig { payment_url, merchant_code, secret_key: Secret::new(secret_key), return_url, locale }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// The subset of the server configuration the request handlers need. Kept as small as possible,
/// and excludes secrets, so it is safe to pass around the system.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}
