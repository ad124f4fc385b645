use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::CurrencyCode;

/// A resolved USD → `currency` exchange rate valid on `rate_date`.
///
/// `currency` is always the code the caller asked for, never the feed's
/// free-form currency label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateRecord {
    pub currency: CurrencyCode,
    pub rate_date: NaiveDate,
    pub rate: Decimal,
}
