//! Transaction primitives.
//!
//! A `Transaction` is a USD purchase, created once by the write path and never
//! mutated afterwards.

use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::MoneyCents;

/// Maximum description length, in Unicode scalar values.
pub const MAX_DESCRIPTION_CHARS: usize = 50;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub description: String,
    pub date: NaiveDate,
    #[serde(rename = "amount_cents")]
    pub amount: MoneyCents,
    pub created_at: DateTime<Utc>,
    /// Advisory retention hint (`created_at + 1 year`); nothing deletes on it.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Builds a fresh transaction from already validated fields.
    pub(crate) fn new(description: String, date: NaiveDate, amount: MoneyCents) -> Self {
        let created_at = Utc::now();
        Self {
            id: Uuid::new_v4(),
            description,
            date,
            amount,
            created_at,
            expires_at: created_at.checked_add_months(Months::new(12)),
        }
    }

    /// Whether the advisory retention period is over.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now > expires_at)
    }
}
