use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const CURRENCY_CODE: &str = "VND";
/// The number of minor units in one major currency unit. The gateway wire format expresses all
/// amounts in minor units.
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

//--------------------------------------       Money       -----------------------------------------------------------
/// A monetary amount, stored as an integer number of minor currency units (fixed-point decimal
/// with two places). All pricing arithmetic happens on this type so that binary floating point
/// never touches an amount.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, AddAssign, add_assign);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a monetary amount: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MoneyConversionError(format!("Value {value} is too large to convert to Money")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let major = abs / MINOR_UNITS_PER_MAJOR as u64;
        let minor = abs % MINOR_UNITS_PER_MAJOR as u64;
        write!(f, "{sign}{major}.{minor:02}")
    }
}

impl Money {
    /// The amount in minor units. This is the representation the payment gateway uses on the wire.
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_minor_units(units: i64) -> Self {
        Self(units)
    }

    /// Builds an amount from whole major currency units.
    pub fn from_major_units(units: i64) -> Self {
        Self(units * MINOR_UNITS_PER_MAJOR)
    }

    /// Multiplies the amount by a scalar. `None` when the result does not fit in an `i64`.
    pub fn checked_mul(self, rhs: i64) -> Option<Self> {
        self.0.checked_mul(rhs).map(Self)
    }

    /// Multiplies the amount by `percent / 100`, rounding half-up to the nearest minor unit.
    /// `percent` is clamped to `[0, 100]`. `None` when the intermediate product overflows.
    pub fn percent_of(&self, percent: i64) -> Option<Self> {
        let percent = percent.clamp(0, 100);
        let scaled = self.0.checked_mul(percent)?.checked_add(50)?;
        Some(Self(scaled.div_euclid(100)))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_renders_two_decimal_places() {
        assert_eq!(Money::from(123_456).to_string(), "1234.56");
        assert_eq!(Money::from(5).to_string(), "0.05");
        assert_eq!(Money::from(-10_050).to_string(), "-100.50");
        assert_eq!(Money::default().to_string(), "0.00");
    }

    #[test]
    fn arithmetic() {
        let a = Money::from_major_units(100);
        let b = Money::from(2_550);
        assert_eq!((a + b).value(), 12_550);
        assert_eq!((a - b).value(), 7_450);
        assert_eq!(a.checked_mul(3).unwrap().value(), 30_000);
        assert_eq!((-b).value(), -2_550);
        let total: Money = [a, b, b].into_iter().sum();
        assert_eq!(total.value(), 15_100);
    }

    #[test]
    fn percent_of_rounds_half_up() {
        assert_eq!(Money::from(10_000_000).percent_of(80).unwrap().value(), 8_000_000);
        // 333 * 33% = 109.89 -> 110
        assert_eq!(Money::from(333).percent_of(33).unwrap().value(), 110);
        // 101 * 50% = 50.5 -> 51
        assert_eq!(Money::from(101).percent_of(50).unwrap().value(), 51);
        assert_eq!(Money::from(1_000).percent_of(150).unwrap().value(), 1_000);
        assert_eq!(Money::from(1_000).percent_of(-5).unwrap().value(), 0);
    }

    #[test]
    fn multiplication_overflow_is_detected() {
        assert!(Money::from(i64::MAX).checked_mul(2).is_none());
        assert!(Money::from(i64::MAX / 2).checked_mul(3).is_none());
        assert!(Money::from(i64::MAX).percent_of(50).is_none());
    }
}
