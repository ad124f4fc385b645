//! Client for the Treasury "rates of exchange" feed.
//!
//! The feed is queried for the single most recent record inside the window
//! of the purchase date:
//!
//! ```text
//! GET {base}/v1/accounting/od/rates_of_exchange
//!     ?filter=currency:eq:EUR,record_date:lte:2023-04-15,record_date:gte:2022-10-15
//!     &sort=-record_date
//!     &limit=1
//! ```
//!
//! Transport failures (refused, reset, timed out, also while reading the
//! body) are retried up to
//! `max_attempts` times, sleeping `k² × backoff_unit` after attempt `k`. HTTP
//! status errors are returned immediately. Dropping the returned future aborts
//! the in-flight request and any pending backoff.

use std::{
    str::FromStr,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{StatusCode, Url, header};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    CurrencyCode, RateRecord, RequestContext,
    window::{DATE_FORMAT, RateWindow, parse_date},
};

pub const TREASURY_BASE_URL: &str = "https://api.fiscaldata.treasury.gov/services/api/fiscal_service";
pub const RATES_OF_EXCHANGE_PATH: &str = "/v1/accounting/od/rates_of_exchange";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Errors returned by a [`RateFeed`].
#[derive(Debug, Error)]
pub enum FeedError {
    /// The request never produced a response, after every attempt.
    #[error("failed to execute request after {attempts} attempts: {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },
    #[error("API returned error status: {status}")]
    Status { status: u16, body: String },
    #[error("no exchange rate available within 6 months")]
    Empty,
    #[error("malformed feed response: {0}")]
    Malformed(String),
    #[error("failed to build request: {0}")]
    Request(String),
}

/// Source of exchange rates.
#[async_trait]
pub trait RateFeed: Send + Sync {
    /// Most recent rate for `currency` inside the window of `transaction_date`.
    async fn fetch_rate(
        &self,
        ctx: &RequestContext,
        currency: &CurrencyCode,
        transaction_date: NaiveDate,
    ) -> Result<RateRecord, FeedError>;
}

/// Transport settings of [`TreasuryClient`].
#[derive(Clone, Debug)]
pub struct FeedConfig {
    pub base_url: String,
    /// Connect plus read budget of a single attempt.
    pub timeout: Duration,
    pub max_attempts: u32,
    /// Attempt `k` sleeps `k² × backoff_unit` before the next one.
    pub backoff_unit: Duration,
    pub pool_max_idle_per_host: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: TREASURY_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
            max_attempts: 3,
            backoff_unit: Duration::from_secs(1),
            pool_max_idle_per_host: 20,
        }
    }
}

impl FeedConfig {
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_unit * attempt.saturating_mul(attempt)
    }
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    data: Vec<FeedRow>,
}

#[derive(Debug, Deserialize)]
struct FeedRow {
    exchange_rate: String,
    record_date: String,
    /// Free-form label such as "Euro Zone-Euro"; never used as identity.
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

/// [`RateFeed`] backed by the Treasury fiscal data API.
#[derive(Clone, Debug)]
pub struct TreasuryClient {
    http: reqwest::Client,
    config: FeedConfig,
}

impl TreasuryClient {
    pub fn new(config: FeedConfig) -> Result<Self, FeedError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .map_err(|err| FeedError::Request(err.to_string()))?;
        Ok(Self { http, config })
    }

    #[must_use]
    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    fn rate_url(&self, currency: &CurrencyCode, window: RateWindow) -> Result<Url, FeedError> {
        let base = format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            RATES_OF_EXCHANGE_PATH
        );
        let mut url = Url::parse(&base)
            .map_err(|err| FeedError::Request(format!("invalid base url: {err}")))?;
        url.query_pairs_mut()
            .append_pair("filter", &rate_filter(currency, window))
            .append_pair("sort", "-record_date")
            .append_pair("limit", "1");
        Ok(url)
    }

    /// Fresh request per attempt; nothing is shared between retries.
    fn request(&self, ctx: &RequestContext, url: &Url) -> reqwest::RequestBuilder {
        let mut request = self
            .http
            .get(url.clone())
            .header(header::ACCEPT, "application/json");
        if let Some(request_id) = ctx.request_id.as_deref() {
            request = request.header(REQUEST_ID_HEADER, request_id);
        }
        request
    }

    /// One attempt: send the request and read the whole body.
    async fn attempt(
        &self,
        ctx: &RequestContext,
        url: &Url,
    ) -> Result<(StatusCode, String), reqwest::Error> {
        let response = self.request(ctx, url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }

    async fn fetch_with_retry(
        &self,
        ctx: &RequestContext,
        url: &Url,
    ) -> Result<(StatusCode, String), FeedError> {
        let request_id = ctx.log_id();
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let started = Instant::now();
            let result = self.attempt(ctx, url).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok((status, body)) => {
                    info!(
                        request_id,
                        attempt,
                        duration_ms,
                        status = status.as_u16(),
                        "rate feed request completed"
                    );
                    return Ok((status, body));
                }
                Err(source) if attempt < max_attempts && is_transport(&source) => {
                    let backoff = self.config.backoff(attempt);
                    warn!(
                        request_id,
                        attempt,
                        max_attempts,
                        duration_ms,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %source,
                        "rate feed request failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(source) => {
                    error!(
                        request_id,
                        attempt,
                        duration_ms,
                        error = %source,
                        "rate feed request failed"
                    );
                    return Err(FeedError::Transport {
                        attempts: attempt,
                        source,
                    });
                }
            }
        }
    }
}

#[async_trait]
impl RateFeed for TreasuryClient {
    async fn fetch_rate(
        &self,
        ctx: &RequestContext,
        currency: &CurrencyCode,
        transaction_date: NaiveDate,
    ) -> Result<RateRecord, FeedError> {
        let window = RateWindow::for_transaction(transaction_date);
        let url = self.rate_url(currency, window)?;
        debug!(request_id = ctx.log_id(), %url, "rate feed request url");

        let (status, body) = self.fetch_with_retry(ctx, &url).await?;

        if status != StatusCode::OK {
            error!(
                request_id = ctx.log_id(),
                status = status.as_u16(),
                body = %body,
                "rate feed returned error status"
            );
            return Err(FeedError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: FeedResponse = serde_json::from_str(&body)
            .map_err(|err| FeedError::Malformed(format!("invalid json: {err}")))?;
        normalize(ctx, currency, parsed.data)
    }
}

/// `currency:eq:<CODE>,record_date:lte:<to>,record_date:gte:<from>`
fn rate_filter(currency: &CurrencyCode, window: RateWindow) -> String {
    format!(
        "currency:eq:{},record_date:lte:{},record_date:gte:{}",
        currency,
        window.to.format(DATE_FORMAT),
        window.from.format(DATE_FORMAT)
    )
}

/// Failures where no usable response arrived: refused, reset or timed out,
/// before or while the body was read.
fn is_transport(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout() || err.is_request() || err.is_body() || err.is_decode()
}

/// Turns the rows of an OK response into a single rate record.
///
/// The feed sorts by descending record date, so the first row is the most
/// recent one.
fn normalize(
    ctx: &RequestContext,
    currency: &CurrencyCode,
    rows: Vec<FeedRow>,
) -> Result<RateRecord, FeedError> {
    if rows.len() > 1 {
        warn!(
            request_id = ctx.log_id(),
            %currency,
            rows = rows.len(),
            "rate feed returned more than one row, using the first"
        );
    }

    let row = rows.into_iter().next().ok_or(FeedError::Empty)?;
    debug!(
        request_id = ctx.log_id(),
        label = row.currency.as_deref().unwrap_or_default(),
        country = row.country.as_deref().unwrap_or_default(),
        record_date = %row.record_date,
        exchange_rate = %row.exchange_rate,
        "rate data retrieved"
    );

    let rate = Decimal::from_str(row.exchange_rate.trim()).map_err(|err| {
        FeedError::Malformed(format!("exchange_rate \"{}\": {err}", row.exchange_rate))
    })?;
    if rate <= Decimal::ZERO {
        return Err(FeedError::Malformed(format!(
            "exchange_rate {rate} is not positive"
        )));
    }

    let rate_date = parse_date(row.record_date.trim()).ok_or_else(|| {
        FeedError::Malformed(format!("record_date \"{}\"", row.record_date))
    })?;

    Ok(RateRecord {
        currency: currency.clone(),
        rate_date,
        rate,
    })
}

#[cfg(test)]
pub use mock::{MockAnswer, MockRateFeed};

#[cfg(test)]
mod mock {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// What [`MockRateFeed`] answers with.
    #[derive(Clone, Debug)]
    pub enum MockAnswer {
        Rate { rate: Decimal, rate_date: NaiveDate },
        Empty,
        Status(u16),
    }

    /// In-process feed for tests; counts calls.
    #[derive(Debug)]
    pub struct MockRateFeed {
        answer: parking_lot::Mutex<MockAnswer>,
        calls: AtomicUsize,
    }

    impl MockRateFeed {
        pub fn new(answer: MockAnswer) -> Self {
            Self {
                answer: parking_lot::Mutex::new(answer),
                calls: AtomicUsize::new(0),
            }
        }

        /// Answers with `rate` (e.g. `"0.85"`) recorded on `rate_date`.
        ///
        /// # Panics
        ///
        /// On unparseable arguments.
        pub fn with_rate(rate: &str, rate_date: &str) -> Self {
            Self::new(MockAnswer::Rate {
                rate: rate.parse().expect("mock rate"),
                rate_date: parse_date(rate_date).expect("mock rate date"),
            })
        }

        pub fn set_answer(&self, answer: MockAnswer) {
            *self.answer.lock() = answer;
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RateFeed for MockRateFeed {
        async fn fetch_rate(
            &self,
            _ctx: &RequestContext,
            currency: &CurrencyCode,
            _transaction_date: NaiveDate,
        ) -> Result<RateRecord, FeedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.answer.lock().clone() {
                MockAnswer::Rate { rate, rate_date } => Ok(RateRecord {
                    currency: currency.clone(),
                    rate_date,
                    rate,
                }),
                MockAnswer::Empty => Err(FeedError::Empty),
                MockAnswer::Status(status) => Err(FeedError::Status {
                    status,
                    body: String::new(),
                }),
            }
        }
    }
}
