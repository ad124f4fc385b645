use api_types::error::ErrorResponse;
use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::{EngineError, ErrorKind, FeedError, RequestContext};
use thiserror::Error;

pub use server::{REQUEST_ID_HEADER, ServerState, router, run_with_listener, spawn_with_listener};

mod health;
mod server;
mod transactions;

pub mod types {
    pub mod transaction {
        pub use api_types::transaction::{
            ConvertQuery, ConvertedTransactionView, TransactionCreated, TransactionNew,
            TransactionView,
        };
    }

    pub mod error {
        pub use api_types::error::ErrorResponse;
    }

    pub mod health {
        pub use api_types::health::Health;
    }
}

/// Failure of a single HTTP request, tagged with the request ID it belongs to.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{source}")]
    Engine {
        request_id: String,
        #[source]
        source: EngineError,
    },
    /// Body or query string could not be decoded.
    #[error("{message}")]
    InvalidRequest { request_id: String, message: String },
}

impl ServerError {
    pub fn engine(ctx: &RequestContext, source: EngineError) -> Self {
        Self::Engine {
            request_id: ctx.log_id().to_string(),
            source,
        }
    }

    pub fn invalid_request(ctx: &RequestContext, message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            request_id: ctx.log_id().to_string(),
            message: message.into(),
        }
    }

    pub fn request_id(&self) -> &str {
        match self {
            Self::Engine { request_id, .. } | Self::InvalidRequest { request_id, .. } => request_id,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Engine { source, .. } => status_for_kind(source.kind()),
            Self::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
        }
    }

    /// Short title carried in the `error` field of the envelope.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Engine { source, .. } => title_for_engine_error(source),
            Self::InvalidRequest { .. } => "Invalid request body",
        }
    }
}

fn status_for_kind(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput | ErrorKind::NoRateInWindow => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn title_for_engine_error(err: &EngineError) -> &'static str {
    match err {
        EngineError::InvalidDate(_) => "Invalid date format",
        EngineError::FutureDate(_) => "Future date not allowed",
        EngineError::DescriptionTooLong(_) => "Description too long",
        EngineError::InvalidAmount(_) => "Invalid amount",
        EngineError::MissingCurrency => "Missing currency parameter",
        EngineError::InvalidCurrency(_) => "Invalid currency code",
        EngineError::KeyNotFound(_) => "Transaction not found",
        EngineError::NoRateInWindow { .. }
        | EngineError::Feed {
            source: FeedError::Empty,
            ..
        } => "No exchange rate available",
        EngineError::RateOutOfWindow { .. } => "Exchange rate outside allowed range",
        EngineError::Feed {
            source: FeedError::Transport { .. } | FeedError::Status { .. },
            ..
        } => "Exchange rate service unavailable",
        EngineError::Feed { .. }
        | EngineError::ConversionOverflow { .. }
        | EngineError::Corrupted { .. }
        | EngineError::Database(_)
        | EngineError::Configuration(_) => "Internal server error",
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let description = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(request_id = self.request_id(), error = %self, "internal error");
            "An unexpected error occurred".to_string()
        } else {
            tracing::warn!(
                request_id = self.request_id(),
                status = status.as_u16(),
                error = %self,
                "request failed"
            );
            self.to_string()
        };

        let body = ErrorResponse {
            error: self.title().to_string(),
            status: status.as_u16(),
            description,
            request_id: self.request_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}
