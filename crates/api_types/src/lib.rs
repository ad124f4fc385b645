//! JSON bodies shared by the HTTP server and its clients.
//!
//! Dates travel as `YYYY-MM-DD` strings, amounts as JSON numbers with at most
//! two fractional digits.

use serde::{Deserialize, Serialize};

pub mod transaction {
    use super::*;

    /// Request body of `POST /transactions`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub description: String,
        pub date: String,
        /// USD, rounded half away from zero to cents on creation.
        pub amount: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionCreated {
        pub id: String,
    }

    /// Response body of `GET /transactions/{id}`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: String,
        pub description: String,
        pub date: String,
        pub amount: f64,
    }

    /// Query of `GET /transactions/{id}/convert`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ConvertQuery {
        pub currency: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ConvertedTransactionView {
        pub id: String,
        pub description: String,
        pub date: String,
        pub original_amount: f64,
        pub currency: String,
        pub exchange_rate: f64,
        pub converted_amount: f64,
        pub rate_date: String,
    }
}

pub mod error {
    use super::*;

    /// Envelope of every error response.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ErrorResponse {
        /// Short title, e.g. "Transaction not found".
        pub error: String,
        pub status: u16,
        pub description: String,
        pub request_id: String,
    }
}

pub mod health {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Health {
        pub status: String,
    }

    impl Health {
        pub fn ok() -> Self {
            Self {
                status: "ok".to_string(),
            }
        }
    }
}
