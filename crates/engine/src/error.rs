//! The module contains the errors the engine can return.
//!
//! Every [`EngineError`] belongs to exactly one [`ErrorKind`], which is the
//! taxonomy surfaced to callers:
//!
//! - [`InvalidInput`] for anything rejected at the boundary (date, amount,
//!   description, currency code).
//! - [`NotFound`] when a transaction id is unknown.
//! - [`NoRateInWindow`] when the feed has no usable rate for the window.
//! - [`UpstreamUnavailable`] when the feed cannot be reached or answers with
//!   a non-OK status.
//! - [`Internal`] for everything else.
//!
//!  [`InvalidInput`]: ErrorKind::InvalidInput
//!  [`NotFound`]: ErrorKind::NotFound
//!  [`NoRateInWindow`]: ErrorKind::NoRateInWindow
//!  [`UpstreamUnavailable`]: ErrorKind::UpstreamUnavailable
//!  [`Internal`]: ErrorKind::Internal
use chrono::NaiveDate;
use sea_orm::DbErr;
use thiserror::Error;

use rust_decimal::Decimal;

use crate::{MoneyCents, feed::FeedError};

/// Error classes surfaced to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    NoRateInWindow,
    UpstreamUnavailable,
    Internal,
}

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid date \"{0}\", expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("transaction date {0} is in the future")]
    FutureDate(NaiveDate),
    #[error("description has {0} characters, at most 50 allowed")]
    DescriptionTooLong(usize),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("currency is required")]
    MissingCurrency,
    #[error("invalid currency code \"{0}\", expected 3 characters")]
    InvalidCurrency(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("no exchange rate available within 6 months of {date} for currency {currency}")]
    NoRateInWindow { currency: String, date: NaiveDate },
    #[error(
        "exchange rate date {rate_date} is outside the allowed range (must be between {from} and {to} inclusive)"
    )]
    RateOutOfWindow {
        rate_date: NaiveDate,
        from: NaiveDate,
        to: NaiveDate,
    },
    #[error("failed to get exchange rate for {currency} on {date}: {source}")]
    Feed {
        currency: String,
        date: NaiveDate,
        #[source]
        source: FeedError,
    },
    #[error("converting {amount} at rate {rate} overflows")]
    ConversionOverflow { amount: MoneyCents, rate: Decimal },
    #[error("failed to decode stored record \"{key}\": {source}")]
    Corrupted {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("engine misconfigured: {0}")]
    Configuration(String),
}

impl EngineError {
    /// Classify the error for the caller.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidDate(_)
            | Self::FutureDate(_)
            | Self::DescriptionTooLong(_)
            | Self::InvalidAmount(_)
            | Self::MissingCurrency
            | Self::InvalidCurrency(_) => ErrorKind::InvalidInput,
            Self::KeyNotFound(_) => ErrorKind::NotFound,
            Self::NoRateInWindow { .. } | Self::RateOutOfWindow { .. } => {
                ErrorKind::NoRateInWindow
            }
            Self::Feed { source, .. } => match source {
                FeedError::Transport { .. } | FeedError::Status { .. } => {
                    ErrorKind::UpstreamUnavailable
                }
                // An empty answer is normally mapped to `NoRateInWindow` by the
                // resolver; a bare one still means there is nothing to convert with.
                FeedError::Empty => ErrorKind::NoRateInWindow,
                FeedError::Malformed(_) | FeedError::Request(_) => ErrorKind::Internal,
            },
            Self::ConversionOverflow { .. }
            | Self::Corrupted { .. }
            | Self::Database(_)
            | Self::Configuration(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn validation_errors_are_invalid_input() {
        assert_eq!(EngineError::MissingCurrency.kind(), ErrorKind::InvalidInput);
        assert_eq!(
            EngineError::InvalidCurrency("EURO".into()).kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            EngineError::DescriptionTooLong(51).kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            EngineError::FutureDate(date("2999-01-01")).kind(),
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn window_errors_share_a_kind() {
        let empty = EngineError::NoRateInWindow {
            currency: "EUR".into(),
            date: date("2023-04-15"),
        };
        let outside = EngineError::RateOutOfWindow {
            rate_date: date("2022-01-01"),
            from: date("2022-10-15"),
            to: date("2023-04-15"),
        };
        assert_eq!(empty.kind(), ErrorKind::NoRateInWindow);
        assert_eq!(outside.kind(), ErrorKind::NoRateInWindow);
        assert!(empty.to_string().contains("6 months"));
    }

    #[test]
    fn feed_status_is_upstream_unavailable() {
        let err = EngineError::Feed {
            currency: "EUR".into(),
            date: date("2023-04-15"),
            source: FeedError::Status {
                status: 502,
                body: "bad gateway".into(),
            },
        };
        assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
    }

    #[test]
    fn malformed_feed_payload_is_internal() {
        let err = EngineError::Feed {
            currency: "EUR".into(),
            date: date("2023-04-15"),
            source: FeedError::Malformed("exchange_rate \"abc\"".into()),
        };
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
