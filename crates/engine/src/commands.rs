//! Command structs for engine operations.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::{
    EngineError, MoneyCents, ResultEngine,
    transactions::{MAX_DESCRIPTION_CHARS, Transaction},
    window::parse_date,
};

/// Create a purchase transaction.
///
/// Fields are kept as received; [`CreateTransactionCmd::validate`] applies the
/// rules in a fixed order so callers always see the first violation:
/// date format, future date, description length, amount sign.
#[derive(Clone, Debug)]
pub struct CreateTransactionCmd {
    pub description: String,
    /// `YYYY-MM-DD`.
    pub date: String,
    pub amount: Decimal,
}

impl CreateTransactionCmd {
    #[must_use]
    pub fn new(description: impl Into<String>, date: impl Into<String>, amount: Decimal) -> Self {
        Self {
            description: description.into(),
            date: date.into(),
            amount,
        }
    }

    /// Checks the command against `today` (UTC) and builds the transaction.
    pub fn validate(self, today: NaiveDate) -> ResultEngine<Transaction> {
        let date =
            parse_date(&self.date).ok_or_else(|| EngineError::InvalidDate(self.date.clone()))?;
        if date > today {
            return Err(EngineError::FutureDate(date));
        }

        let chars = self.description.chars().count();
        if chars > MAX_DESCRIPTION_CHARS {
            return Err(EngineError::DescriptionTooLong(chars));
        }

        if self.amount <= Decimal::ZERO {
            return Err(EngineError::InvalidAmount(
                "amount must be a positive value".to_string(),
            ));
        }
        let amount = MoneyCents::from_decimal(self.amount)?;
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "amount rounds to zero cents".to_string(),
            ));
        }

        Ok(Transaction::new(self.description, date, amount))
    }
}
