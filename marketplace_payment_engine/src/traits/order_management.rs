use crate::{
    db_types::{Order, OrderId, OrderLine, OrderWithItems, PaymentTransaction, Shop},
    traits::PaymentGatewayError,
};

/// Read-side access to orders, lines and payment transactions.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Fetches an order together with its lines, or `None` if it does not exist.
    async fn fetch_order(&self, id: OrderId) -> Result<Option<OrderWithItems>, PaymentGatewayError>;

    /// Fetches the order headers for a user's purchase history, oldest first.
    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, PaymentGatewayError>;

    /// Fetches every order line placed against the given shop, oldest first.
    async fn fetch_lines_for_shop(&self, shop_id: i64) -> Result<Vec<OrderLine>, PaymentGatewayError>;

    /// Resolves the shop owned by the given user, if any. Sellers act through their shop.
    async fn fetch_shop_for_owner(&self, owner_id: i64) -> Result<Option<Shop>, PaymentGatewayError>;

    /// Fetches a payment transaction by the internal transaction reference.
    async fn fetch_transaction_by_ref(
        &self,
        transaction_ref: &str,
    ) -> Result<Option<PaymentTransaction>, PaymentGatewayError>;
}
