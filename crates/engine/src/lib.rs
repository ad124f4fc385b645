//! Purchase transactions stored in USD and converted on demand with the
//! Treasury rates-of-exchange feed.
//!
//! The [`Engine`] ties together:
//!
//! - a [`TransactionStore`] holding the purchases,
//! - a [`RateResolver`] that looks rates up in the [`RateCache`] before asking
//!   the [`RateFeed`],
//! - the conversion rules of [`ConvertedTransaction`].

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

pub use cache::{CacheStats, DEFAULT_TTL, RateCache};
pub use commands::CreateTransactionCmd;
pub use conversion::ConvertedTransaction;
pub use currency::CurrencyCode;
pub use error::{EngineError, ErrorKind};
pub use feed::{FeedConfig, FeedError, RateFeed, TreasuryClient};
#[cfg(test)]
pub use feed::{MockAnswer, MockRateFeed};
pub use money::MoneyCents;
pub use rate::RateRecord;
pub use resolver::RateResolver;
pub use store::{MemoryStore, SqlStore, TransactionStore};
pub use transactions::Transaction;
pub use window::{DATE_FORMAT, RateWindow};

pub mod cache;
mod commands;
mod conversion;
mod currency;
mod error;
pub mod feed;
mod kv;
mod money;
mod rate;
mod resolver;
pub mod store;
mod transactions;
pub mod window;

type ResultEngine<T> = Result<T, EngineError>;

/// Per-request data carried from the HTTP boundary into every engine call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Propagated to the feed as `X-Request-ID` when present.
    pub request_id: Option<String>,
}

impl RequestContext {
    #[must_use]
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: Some(request_id.into()),
        }
    }

    /// Value used for the `request_id` field of log lines.
    #[must_use]
    pub fn log_id(&self) -> &str {
        self.request_id.as_deref().unwrap_or("unknown")
    }
}

pub struct Engine {
    store: Arc<dyn TransactionStore>,
    resolver: RateResolver,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// The shared rate cache, for TTL changes, purges and stats.
    #[must_use]
    pub fn cache(&self) -> &Arc<RateCache> {
        self.resolver.cache()
    }

    /// Validates and stores a purchase, returning its new id.
    ///
    /// Never touches the rate path.
    pub async fn create_transaction(
        &self,
        ctx: &RequestContext,
        cmd: CreateTransactionCmd,
    ) -> ResultEngine<String> {
        info!(
            request_id = ctx.log_id(),
            description = %cmd.description,
            date = %cmd.date,
            amount = %cmd.amount,
            "creating new transaction"
        );

        let transaction = cmd.validate(Utc::now().date_naive())?;
        let id = self.store.store(ctx, &transaction).await?;

        info!(request_id = ctx.log_id(), %id, "transaction created");
        Ok(id)
    }

    pub async fn transaction(&self, ctx: &RequestContext, id: &str) -> ResultEngine<Transaction> {
        debug!(request_id = ctx.log_id(), %id, "retrieving transaction");
        self.store.find_by_id(ctx, id).await
    }

    /// Converts transaction `id` into `currency`.
    ///
    /// The currency code is checked before the store or the feed are touched.
    pub async fn convert(
        &self,
        ctx: &RequestContext,
        id: &str,
        currency: &str,
    ) -> ResultEngine<ConvertedTransaction> {
        let currency = CurrencyCode::try_from(currency)?;
        info!(request_id = ctx.log_id(), %id, %currency, "converting transaction");

        let transaction = self.store.find_by_id(ctx, id).await?;
        let rate = self.resolver.resolve(ctx, &currency, transaction.date).await?;
        let converted = ConvertedTransaction::new(&transaction, &rate)?;

        info!(
            request_id = ctx.log_id(),
            %id,
            %currency,
            original_amount = %converted.original_amount,
            exchange_rate = %converted.exchange_rate,
            converted_amount = %converted.converted_amount,
            rate_date = %converted.rate_date,
            "conversion completed"
        );
        Ok(converted)
    }
}

#[derive(Default)]
pub struct EngineBuilder {
    store: Option<Arc<dyn TransactionStore>>,
    feed: Option<Arc<dyn RateFeed>>,
    cache: Option<Arc<RateCache>>,
}

impl EngineBuilder {
    /// Pass the required transaction store
    pub fn store(mut self, store: Arc<dyn TransactionStore>) -> EngineBuilder {
        self.store = Some(store);
        self
    }

    /// Pass the required rate feed
    pub fn feed(mut self, feed: Arc<dyn RateFeed>) -> EngineBuilder {
        self.feed = Some(feed);
        self
    }

    /// Share an existing cache; a fresh one with the default TTL otherwise.
    pub fn cache(mut self, cache: Arc<RateCache>) -> EngineBuilder {
        self.cache = Some(cache);
        self
    }

    /// Construct `Engine`
    pub fn build(self) -> ResultEngine<Engine> {
        let store = self.store.ok_or_else(|| {
            EngineError::Configuration("transaction store is required".to_string())
        })?;
        let feed = self
            .feed
            .ok_or_else(|| EngineError::Configuration("rate feed is required".to_string()))?;
        let cache = self.cache.unwrap_or_default();

        Ok(Engine {
            store,
            resolver: RateResolver::new(cache, feed),
        })
    }
}
