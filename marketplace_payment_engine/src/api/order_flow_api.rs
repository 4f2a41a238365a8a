use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{
        CompensationOutcome,
        FulfilmentStatus,
        LineItemRequest,
        NewOrder,
        Order,
        OrderId,
        OrderLine,
        OrderWithItems,
        PaymentMethod,
        ShippingInfo,
    },
    traits::{OrderManagement, PaymentGatewayDatabase, PaymentGatewayError},
};

/// `OrderFlowApi` is the primary API for converting carts into settled orders and for the
/// shop-side order lifecycle. Every operation takes its actor identity as an explicit argument;
/// the engine never reaches for ambient request state.
pub struct OrderFlowApi<B> {
    db: B,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> OrderFlowApi<B>
where B: PaymentGatewayDatabase
{
    /// Submits a checkout for `user_id`. The entire cart is settled in one atomic transaction:
    /// every line priced and its stock reserved, or nothing at all. When the payment method is
    /// the online gateway the returned aggregate carries the pending payment transaction the
    /// caller needs to build the redirect URL.
    pub async fn place_order(
        &self,
        user_id: i64,
        payment_method: PaymentMethod,
        shipping: ShippingInfo,
        items: Vec<LineItemRequest>,
    ) -> Result<OrderWithItems, PaymentGatewayError> {
        let mut order = NewOrder::new(user_id, payment_method, shipping);
        order.items = items;
        let result = self.db.create_order(order).await?;
        debug!(
            "🛒️ Checkout complete for user {user_id}: order {} with {} line(s), total {}",
            result.order.id,
            result.items.len(),
            result.order.total_price
        );
        Ok(result)
    }

    /// The order history for a user, headers only, oldest first.
    pub async fn order_history(&self, user_id: i64) -> Result<Vec<Order>, PaymentGatewayError> {
        self.db.fetch_orders_for_user(user_id).await
    }

    /// One order with its lines. Only the owning user may read it; anyone else sees "not found"
    /// rather than a confirmation the order exists.
    pub async fn order_detail(&self, user_id: i64, id: OrderId) -> Result<OrderWithItems, PaymentGatewayError> {
        let order = self.db.fetch_order(id).await?.ok_or(PaymentGatewayError::OrderNotFound(id))?;
        if order.order.user_id != user_id {
            return Err(PaymentGatewayError::OrderNotFound(id));
        }
        Ok(order)
    }

    /// All lines placed against the shop owned by `owner_id`.
    pub async fn shop_order_lines(&self, owner_id: i64) -> Result<Vec<OrderLine>, PaymentGatewayError> {
        let shop = self.shop_of(owner_id).await?;
        self.db.fetch_lines_for_shop(shop).await
    }

    /// Moves one of the seller's lines forward along Pending -> Confirmed -> Shipped.
    pub async fn advance_line(
        &self,
        owner_id: i64,
        line_id: i64,
        new_status: FulfilmentStatus,
    ) -> Result<OrderLine, PaymentGatewayError> {
        let shop = self.shop_of(owner_id).await?;
        self.db.update_line_fulfilment(shop, line_id, new_status).await
    }

    /// Rejects one of the seller's lines, compensating the original reservation: stock is
    /// restored, the line deleted, the order total recomputed, and the order removed entirely
    /// when the rejected line was its last.
    pub async fn reject_line(&self, owner_id: i64, line_id: i64) -> Result<CompensationOutcome, PaymentGatewayError> {
        let shop = self.shop_of(owner_id).await?;
        let outcome = self.db.reject_order_line(shop, line_id).await?;
        match &outcome {
            CompensationOutcome::OrderUpdated(order) => {
                info!("🛒️ Line {line_id} rejected; order {} total is now {}", order.id, order.total_price)
            },
            CompensationOutcome::OrderDeleted(id) => info!("🛒️ Line {line_id} rejected; order {id} had no lines left"),
        }
        Ok(outcome)
    }

    async fn shop_of(&self, owner_id: i64) -> Result<i64, PaymentGatewayError> {
        self.db
            .fetch_shop_for_owner(owner_id)
            .await?
            .map(|shop| shop.id)
            .ok_or_else(|| PaymentGatewayError::PermissionDenied(format!("user {owner_id} does not own a shop")))
    }
}
