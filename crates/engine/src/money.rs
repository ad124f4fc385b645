use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Signed money amount represented as **integer cents**.
///
/// Use this type for **all** monetary values in the engine (purchase amounts
/// in USD and converted amounts in the target currency) so that every value
/// carries exactly two fractional digits.
///
/// # Examples
///
/// ```rust
/// use engine::MoneyCents;
///
/// let amount = MoneyCents::new(12_34);
/// assert_eq!(amount.cents(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// ```
///
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct MoneyCents(i64);

impl MoneyCents {
    pub const ZERO: MoneyCents = MoneyCents(0);

    /// Creates a new amount from integer cents.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the raw value in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Quantizes a decimal to cents, rounding half away from zero.
    ///
    /// ```rust
    /// use engine::MoneyCents;
    /// use rust_decimal::Decimal;
    ///
    /// let amount = MoneyCents::from_decimal("0.125".parse::<Decimal>().unwrap()).unwrap();
    /// assert_eq!(amount.cents(), 13);
    /// ```
    pub fn from_decimal(value: Decimal) -> Result<Self, EngineError> {
        let rounded = round_cents(value);
        rounded
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|cents| cents.to_i64())
            .map(MoneyCents)
            .ok_or_else(|| EngineError::InvalidAmount("amount too large".to_string()))
    }

    /// Exact decimal value with two fractional digits.
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Multiplies by `rate` and rounds the product to cents.
    ///
    /// The product is computed at full decimal precision; the rounding here is
    /// the only one applied to a converted amount.
    pub fn convert(self, rate: Decimal) -> Result<Self, EngineError> {
        self.to_decimal()
            .checked_mul(rate)
            .and_then(|product| Self::from_decimal(product).ok())
            .ok_or(EngineError::ConversionOverflow { amount: self, rate })
    }
}

/// `round_half_away_from_zero(value, 2)`.
#[must_use]
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

impl fmt::Display for MoneyCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / 100;
        let cents = abs % 100;
        write!(f, "{sign}{units}.{cents:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn display_has_two_digits() {
        assert_eq!(MoneyCents::new(0).to_string(), "0.00");
        assert_eq!(MoneyCents::new(1).to_string(), "0.01");
        assert_eq!(MoneyCents::new(10).to_string(), "0.10");
        assert_eq!(MoneyCents::new(12345).to_string(), "123.45");
        assert_eq!(MoneyCents::new(-1050).to_string(), "-10.50");
    }

    #[test]
    fn from_decimal_rounds_half_away_from_zero() {
        assert_eq!(MoneyCents::from_decimal(dec("0.125")).unwrap().cents(), 13);
        assert_eq!(MoneyCents::from_decimal(dec("0.135")).unwrap().cents(), 14);
        assert_eq!(MoneyCents::from_decimal(dec("-0.125")).unwrap().cents(), -13);
        assert_eq!(MoneyCents::from_decimal(dec("99.994")).unwrap().cents(), 9999);
        assert_eq!(MoneyCents::from_decimal(dec("123.45")).unwrap().cents(), 12345);
    }

    #[test]
    fn convert_rounds_only_the_product() {
        let amount = MoneyCents::new(12345);
        assert_eq!(amount.convert(dec("0.85")).unwrap().cents(), 10493);
        assert_eq!(amount.convert(dec("0.8333")).unwrap().cents(), 10287);
        assert_eq!(MoneyCents::new(10000).convert(dec("0.8333")).unwrap().cents(), 8333);
    }

    #[test]
    fn convert_midpoint_goes_up() {
        // 1.00 * 0.125 = 0.125 exactly
        assert_eq!(MoneyCents::new(100).convert(dec("0.125")).unwrap().cents(), 13);
        // 10.01 * 1.5 = 15.015 exactly
        assert_eq!(MoneyCents::new(1001).convert(dec("1.5")).unwrap().cents(), 1502);
    }

    #[test]
    fn convert_overflow_is_internal() {
        let err = MoneyCents::new(i64::MAX).convert(dec("2")).unwrap_err();
        assert!(matches!(err, EngineError::ConversionOverflow { .. }));
        assert_eq!(err.kind(), crate::ErrorKind::Internal);

        let err = MoneyCents::new(100).convert(Decimal::MAX).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Internal);
    }
}
