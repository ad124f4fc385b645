//! The six-month lookback window.
//!
//! A rate is usable for a purchase dated `d` when its record date lies in the
//! closed interval `[d - 6 months, d]`. "6 months" is calendar arithmetic: the
//! same day-of-month six months earlier, clamped to the last day of that month
//! when it does not exist (2023-08-31 gives 2023-02-28).

use chrono::{Months, NaiveDate};

/// Format used for dates on the wire and in feed queries.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Six calendar months before `date`, clamped to month end.
#[must_use]
pub fn six_months_before(date: NaiveDate) -> NaiveDate {
    // Only fails before the start of chrono's calendar.
    date.checked_sub_months(Months::new(6))
        .unwrap_or(NaiveDate::MIN)
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

/// Closed date interval a rate record has to fall in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl RateWindow {
    /// Window for a purchase made on `transaction_date`.
    #[must_use]
    pub fn for_transaction(transaction_date: NaiveDate) -> Self {
        Self {
            from: six_months_before(transaction_date),
            to: transaction_date,
        }
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn same_day_six_months_earlier() {
        assert_eq!(six_months_before(date("2023-04-15")), date("2022-10-15"));
        assert_eq!(six_months_before(date("2024-01-01")), date("2023-07-01"));
    }

    #[test]
    fn end_of_month_rolls_back_to_last_valid_day() {
        assert_eq!(six_months_before(date("2023-08-31")), date("2023-02-28"));
        assert_eq!(six_months_before(date("2024-08-31")), date("2024-02-29"));
        assert_eq!(six_months_before(date("2023-12-31")), date("2023-06-30"));
    }

    #[test]
    fn window_is_closed_on_both_ends() {
        let window = RateWindow::for_transaction(date("2023-04-15"));
        assert!(window.contains(date("2022-10-15")));
        assert!(window.contains(date("2023-04-15")));
        assert!(window.contains(date("2023-04-10")));
        assert!(!window.contains(date("2022-10-14")));
        assert!(!window.contains(date("2023-04-16")));
    }

    #[test]
    fn parse_rejects_other_formats() {
        assert!(parse_date("2023/04/15").is_none());
        assert!(parse_date("15-04-2023").is_none());
        assert!(parse_date("2023-02-30").is_none());
        assert!(parse_date("").is_none());
    }
}
