//! Conversion of a stored purchase into a target currency.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{CurrencyCode, MoneyCents, RateRecord, ResultEngine, transactions::Transaction};

/// A transaction together with its value in another currency. Never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConvertedTransaction {
    pub id: Uuid,
    pub description: String,
    pub date: NaiveDate,
    pub original_amount: MoneyCents,
    pub currency: CurrencyCode,
    pub exchange_rate: Decimal,
    pub converted_amount: MoneyCents,
    pub rate_date: NaiveDate,
}

impl ConvertedTransaction {
    /// `converted_amount = round_half_away_from_zero(amount × rate, 2)`.
    ///
    /// Either every field is filled or an error is returned.
    pub fn new(transaction: &Transaction, rate: &RateRecord) -> ResultEngine<Self> {
        let converted_amount = transaction.amount.convert(rate.rate)?;
        Ok(Self {
            id: transaction.id,
            description: transaction.description.clone(),
            date: transaction.date,
            original_amount: transaction.amount,
            currency: rate.currency.clone(),
            exchange_rate: rate.rate,
            converted_amount,
            rate_date: rate.rate_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CreateTransactionCmd;

    fn tx(amount: &str) -> Transaction {
        CreateTransactionCmd::new("Test", "2023-04-15", amount.parse().unwrap())
            .validate(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .unwrap()
    }

    fn rate(rate: &str) -> RateRecord {
        RateRecord {
            currency: CurrencyCode::try_from("EUR").unwrap(),
            rate_date: NaiveDate::from_ymd_opt(2023, 4, 10).unwrap(),
            rate: rate.parse().unwrap(),
        }
    }

    #[test]
    fn fills_every_field() {
        let tx = tx("123.45");
        let converted = ConvertedTransaction::new(&tx, &rate("0.85")).unwrap();

        assert_eq!(converted.id, tx.id);
        assert_eq!(converted.description, "Test");
        assert_eq!(converted.date, tx.date);
        assert_eq!(converted.original_amount, MoneyCents::new(12345));
        assert_eq!(converted.currency.code(), "EUR");
        assert_eq!(converted.exchange_rate, "0.85".parse::<Decimal>().unwrap());
        assert_eq!(converted.converted_amount, MoneyCents::new(10493));
        assert_eq!(converted.rate_date, NaiveDate::from_ymd_opt(2023, 4, 10).unwrap());
    }

    #[test]
    fn matches_rounded_product_for_many_pairs() {
        for (amount, r, expected) in [
            ("123.45", "0.8333", 10287),
            ("100.00", "0.8333", 8333),
            ("1.00", "1.005", 101),
            ("0.01", "0.5", 1),
            ("0.01", "0.49", 0),
            ("999999.99", "151.23", 15_122_999_849_i64),
        ] {
            let converted = ConvertedTransaction::new(&tx(amount), &rate(r)).unwrap();
            assert_eq!(converted.converted_amount.cents(), expected, "{amount} x {r}");
        }
    }
}
