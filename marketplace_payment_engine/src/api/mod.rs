pub mod order_flow_api;
pub mod payment_api;
