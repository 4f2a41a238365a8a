use log::{debug, info};
use mps_common::Money;
use sqlx::SqlitePool;

use crate::{
    db_types::{
        CompensationOutcome,
        FulfilmentStatus,
        LinePaymentStatus,
        NewOrder,
        Order,
        OrderId,
        OrderLine,
        OrderWithItems,
        PaymentMethod,
        PaymentTransaction,
        Shop,
        StockUnitId,
        TransactionStatus,
    },
    pricing,
    sqlite::db,
    traits::{OrderManagement, PaymentGatewayDatabase, PaymentGatewayError, Settlement},
};

const GATEWAY_SOURCE: &str = "GATEWAY";

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({})", self.url)
    }
}

impl SqliteDatabase {
    /// Creates a new database api object with a connection pool attached to the database at the given URL.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = db::new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, id: OrderId) -> Result<Option<OrderWithItems>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let Some(order) = db::orders::fetch_order(id, &mut conn).await? else {
            return Ok(None);
        };
        let items = db::orders::fetch_order_lines(id, &mut conn).await?;
        let payment = db::transactions::fetch_by_ref(&id.as_transaction_ref(), &mut conn).await?;
        Ok(Some(OrderWithItems { order, items, payment }))
    }

    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let orders = db::orders::fetch_orders_for_user(user_id, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_lines_for_shop(&self, shop_id: i64) -> Result<Vec<OrderLine>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let lines = db::orders::fetch_lines_for_shop(shop_id, &mut conn).await?;
        Ok(lines)
    }

    async fn fetch_shop_for_owner(&self, owner_id: i64) -> Result<Option<Shop>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let shop = db::shops::fetch_shop_for_owner(owner_id, &mut conn).await?;
        Ok(shop)
    }

    async fn fetch_transaction_by_ref(
        &self,
        transaction_ref: &str,
    ) -> Result<Option<PaymentTransaction>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let tx = db::transactions::fetch_by_ref(transaction_ref, &mut conn).await?;
        Ok(tx)
    }
}

impl PaymentGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_order(&self, order: NewOrder) -> Result<OrderWithItems, PaymentGatewayError> {
        if order.items.is_empty() {
            return Err(PaymentGatewayError::ValidationError("order contains no items".to_string()));
        }
        let mut tx = self.pool.begin().await?;
        // The header insert is the first statement, so the transaction takes its write lock up
        // front and every reservation below happens under it.
        let header = db::orders::insert_order(&order, &mut tx).await?;
        let mut items = Vec::with_capacity(order.items.len());
        for item in &order.items {
            let product = db::products::fetch_product(item.product_id, &mut tx)
                .await?
                .filter(|p| p.is_active)
                .ok_or(PaymentGatewayError::ProductNotFound(item.product_id))?;
            let variant = match item.variant_id {
                Some(variant_id) => {
                    let variant = db::products::fetch_variant(variant_id, &mut tx)
                        .await?
                        .ok_or(PaymentGatewayError::VariantNotFound(variant_id))?;
                    if variant.product_id != product.id {
                        return Err(PaymentGatewayError::VariantMismatch { variant_id, product_id: product.id });
                    }
                    Some(variant)
                },
                None => None,
            };
            let priced = pricing::price_line(&product, variant.as_ref(), item.quantity)?;
            let unit = match &variant {
                Some(v) => StockUnitId::Variant(v.id),
                None => StockUnitId::Product(product.id),
            };
            db::products::reserve_stock(unit, item.quantity, &mut tx).await?;
            let line = db::orders::insert_order_line(
                header.id,
                product.id,
                variant.as_ref().map(|v| v.id),
                product.shop_id,
                item.quantity,
                priced.line_total,
                &mut tx,
            )
            .await?;
            items.push(line);
        }
        let total: Money = items.iter().map(|line| line.price).sum();
        let header = db::orders::update_order_total(header.id, total, &mut tx).await?;
        let payment = match order.payment_method {
            PaymentMethod::OnlineGateway => Some(
                db::transactions::insert_transaction(
                    header.id,
                    total,
                    &header.id.as_transaction_ref(),
                    GATEWAY_SOURCE,
                    &mut tx,
                )
                .await?,
            ),
            PaymentMethod::Cod => None,
        };
        tx.commit().await?;
        info!("📦️ Order {} created with {} line(s), total {total}", header.id, items.len());
        Ok(OrderWithItems { order: header, items, payment })
    }

    async fn settle_transaction(
        &self,
        transaction_ref: &str,
        reported_amount: Money,
        settlement: Settlement,
        raw_payload: String,
    ) -> Result<PaymentTransaction, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let payment = db::transactions::fetch_by_ref(transaction_ref, &mut tx)
            .await?
            .ok_or_else(|| PaymentGatewayError::TransactionNotFound(transaction_ref.to_string()))?;
        let order = db::orders::fetch_order(payment.order_id, &mut tx)
            .await?
            .ok_or(PaymentGatewayError::OrderNotFound(payment.order_id))?;
        if order.total_price != reported_amount {
            return Err(PaymentGatewayError::AmountMismatch {
                expected: order.total_price,
                reported: reported_amount,
            });
        }
        if payment.status.is_terminal() {
            return Err(PaymentGatewayError::DuplicateProcessing(transaction_ref.to_string()));
        }
        let (new_status, external_ref) = match settlement {
            Settlement::Success { external_ref } => (TransactionStatus::Success, external_ref),
            Settlement::Failure => (TransactionStatus::Failed, None),
        };
        if new_status == TransactionStatus::Success {
            let paid = db::orders::mark_lines_paid(order.id, &mut tx).await?;
            debug!("💰️ Marked {paid} line(s) of order {} as paid", order.id);
        }
        let updated =
            db::transactions::finalize_transaction(transaction_ref, new_status, external_ref.as_deref(), &raw_payload, &mut tx)
                .await?
                .ok_or_else(|| PaymentGatewayError::DuplicateProcessing(transaction_ref.to_string()))?;
        tx.commit().await?;
        info!("💰️ Transaction [{transaction_ref}] settled as {new_status} for order {}", order.id);
        Ok(updated)
    }

    async fn reject_order_line(
        &self,
        shop_id: i64,
        line_id: i64,
    ) -> Result<CompensationOutcome, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let line = db::orders::fetch_line(line_id, &mut tx)
            .await?
            .ok_or(PaymentGatewayError::OrderLineNotFound(line_id))?;
        if line.shop_id != shop_id {
            return Err(PaymentGatewayError::PermissionDenied(format!(
                "line {line_id} does not belong to shop {shop_id}"
            )));
        }
        if line.fulfilment_status != FulfilmentStatus::Pending || line.payment_status != LinePaymentStatus::Pending {
            return Err(PaymentGatewayError::IllegalStatusTransition(format!(
                "line {line_id} is {}/{} and can no longer be rejected",
                line.fulfilment_status, line.payment_status
            )));
        }
        let unit = match line.variant_id {
            Some(variant_id) => StockUnitId::Variant(variant_id),
            None => StockUnitId::Product(line.product_id),
        };
        db::products::release_stock(unit, line.quantity, &mut tx).await?;
        db::orders::delete_line(line_id, &mut tx).await?;
        let remaining = db::orders::fetch_order_lines(line.order_id, &mut tx).await?;
        let outcome = if remaining.is_empty() {
            db::orders::delete_order(line.order_id, &mut tx).await?;
            CompensationOutcome::OrderDeleted(line.order_id)
        } else {
            let total: Money = remaining.iter().map(|l| l.price).sum();
            let order = db::orders::update_order_total(line.order_id, total, &mut tx).await?;
            CompensationOutcome::OrderUpdated(order)
        };
        tx.commit().await?;
        info!("📦️ Line {line_id} rejected by shop {shop_id}; stock returned to {unit}");
        Ok(outcome)
    }

    async fn update_line_fulfilment(
        &self,
        shop_id: i64,
        line_id: i64,
        new_status: FulfilmentStatus,
    ) -> Result<OrderLine, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let line = db::orders::fetch_line(line_id, &mut tx)
            .await?
            .ok_or(PaymentGatewayError::OrderLineNotFound(line_id))?;
        if line.shop_id != shop_id {
            return Err(PaymentGatewayError::PermissionDenied(format!(
                "line {line_id} does not belong to shop {shop_id}"
            )));
        }
        if !line.fulfilment_status.can_advance_to(new_status) {
            return Err(PaymentGatewayError::IllegalStatusTransition(format!(
                "{} -> {new_status}",
                line.fulfilment_status
            )));
        }
        let updated = db::orders::update_line_fulfilment(line_id, new_status, &mut tx).await?;
        tx.commit().await?;
        debug!("📦️ Line {line_id} moved to {new_status}");
        Ok(updated)
    }

    async fn close(&mut self) -> Result<(), PaymentGatewayError> {
        self.pool.close().await;
        Ok(())
    }
}
