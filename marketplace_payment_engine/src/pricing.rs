//! The pricing engine.
//!
//! A pure function from (product, optional variant, quantity) to a priced line. All arithmetic
//! is fixed-point decimal on [`Money`]; binary floating point never touches an amount, so
//! repeated pricing cannot accumulate rounding drift.

use mps_common::Money;

use crate::{
    db_types::{Product, ProductVariant},
    traits::PaymentGatewayError,
};

/// The outcome of pricing one order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub unit_price: Money,
    /// `unit_price * quantity * discount_factor`, rounded half-up to the minor unit. This is the
    /// value stored on the order line; it is never recomputed later.
    pub line_total: Money,
}

/// Prices one line. The variant's price overrides the product's base price when a variant is
/// supplied; the discount always derives from the product, even when pricing a variant. The
/// discount factor `1 - discount_percent/100` is clamped to `[0, 1]`.
pub fn price_line(
    product: &Product,
    variant: Option<&ProductVariant>,
    quantity: i64,
) -> Result<PricedLine, PaymentGatewayError> {
    if quantity <= 0 {
        return Err(PaymentGatewayError::ValidationError(format!(
            "quantity must be positive, got {quantity}"
        )));
    }
    let unit_price = variant.map(|v| v.price).unwrap_or(product.price);
    let discount = product.discount_percent.clamp(0, 100);
    // Quantity comes straight from the request body, so the multiplication must not wrap.
    let line_total = unit_price
        .checked_mul(quantity)
        .and_then(|gross| gross.percent_of(100 - discount))
        .ok_or_else(|| {
            PaymentGatewayError::ValidationError(format!(
                "line total for quantity {quantity} exceeds the representable amount"
            ))
        })?;
    Ok(PricedLine { unit_price, line_total })
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;

    fn product(price: Money, discount_percent: i64) -> Product {
        Product {
            id: 1,
            shop_id: 1,
            name: "widget".to_string(),
            description: String::new(),
            price,
            quantity: 10,
            discount_percent,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn variant(price: Money) -> ProductVariant {
        ProductVariant { id: 7, product_id: 1, price, quantity: 5, attributes: "{}".to_string() }
    }

    #[test]
    fn base_price_with_discount() {
        // base 100,000.00, 20% off, qty 3 -> 240,000.00
        let p = product(Money::from_major_units(100_000), 20);
        let line = price_line(&p, None, 3).unwrap();
        assert_eq!(line.unit_price, Money::from_major_units(100_000));
        assert_eq!(line.line_total, Money::from_major_units(240_000));
    }

    #[test]
    fn variant_price_overrides_base_price() {
        let p = product(Money::from_major_units(100), 0);
        let v = variant(Money::from_major_units(150));
        let line = price_line(&p, Some(&v), 2).unwrap();
        assert_eq!(line.unit_price, Money::from_major_units(150));
        assert_eq!(line.line_total, Money::from_major_units(300));
    }

    #[test]
    fn discount_comes_from_product_even_for_variants() {
        let p = product(Money::from_major_units(100), 50);
        let v = variant(Money::from_major_units(200));
        let line = price_line(&p, Some(&v), 1).unwrap();
        assert_eq!(line.line_total, Money::from_major_units(100));
    }

    #[test]
    fn discount_factor_is_clamped() {
        let p = product(Money::from_major_units(10), 150);
        let line = price_line(&p, None, 1).unwrap();
        assert_eq!(line.line_total, Money::default());

        let p = product(Money::from_major_units(10), -20);
        let line = price_line(&p, None, 1).unwrap();
        assert_eq!(line.line_total, Money::from_major_units(10));
    }

    #[test]
    fn rounding_is_half_up_on_the_minor_unit() {
        // 0.99 * 3 * 0.67 = 1.9899 -> 1.99
        let p = product(Money::from_minor_units(99), 33);
        let line = price_line(&p, None, 3).unwrap();
        assert_eq!(line.line_total, Money::from_minor_units(199));
    }

    #[test]
    fn absurd_quantities_cannot_overflow_the_line_total() {
        let p = product(Money::from_major_units(100_000), 0);
        let err = price_line(&p, None, i64::MAX / 1_000).unwrap_err();
        assert!(matches!(err, PaymentGatewayError::ValidationError(_)));

        // Overflow in the discount scaling is caught too.
        let p = product(Money::from_minor_units(i64::MAX / 10), 20);
        let err = price_line(&p, None, 1).unwrap_err();
        assert!(matches!(err, PaymentGatewayError::ValidationError(_)));
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let p = product(Money::from_major_units(10), 0);
        assert!(matches!(price_line(&p, None, 0), Err(PaymentGatewayError::ValidationError(_))));
        assert!(matches!(price_line(&p, None, -2), Err(PaymentGatewayError::ValidationError(_))));
    }
}
