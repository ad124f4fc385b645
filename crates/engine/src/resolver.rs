//! Pairs a purchase with an authoritative rate: cache first, then the feed.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::{
    CurrencyCode, EngineError, RateRecord, RequestContext, ResultEngine,
    cache::RateCache,
    feed::{FeedError, RateFeed},
    window::RateWindow,
};

/// Cache-backed rate lookup with an independent window check.
///
/// Failures are never cached; the next call for the same key goes back to the
/// feed.
#[derive(Clone)]
pub struct RateResolver {
    cache: Arc<RateCache>,
    feed: Arc<dyn RateFeed>,
}

impl RateResolver {
    pub fn new(cache: Arc<RateCache>, feed: Arc<dyn RateFeed>) -> Self {
        Self { cache, feed }
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<RateCache> {
        &self.cache
    }

    pub async fn resolve(
        &self,
        ctx: &RequestContext,
        currency: &CurrencyCode,
        transaction_date: NaiveDate,
    ) -> ResultEngine<RateRecord> {
        if let Some(rate) = self.cache.get(currency, transaction_date) {
            info!(
                request_id = ctx.log_id(),
                %currency,
                %transaction_date,
                rate = %rate.rate,
                "cache hit for exchange rate"
            );
            return Ok(rate);
        }

        let rate = self
            .feed
            .fetch_rate(ctx, currency, transaction_date)
            .await
            .map_err(|source| match source {
                FeedError::Empty => EngineError::NoRateInWindow {
                    currency: currency.to_string(),
                    date: transaction_date,
                },
                source => EngineError::Feed {
                    currency: currency.to_string(),
                    date: transaction_date,
                    source,
                },
            })?;

        // The feed filters on the same window; re-check in case it did not.
        let window = RateWindow::for_transaction(transaction_date);
        if !window.contains(rate.rate_date) {
            warn!(
                request_id = ctx.log_id(),
                %currency,
                rate_date = %rate.rate_date,
                %transaction_date,
                window_start = %window.from,
                "exchange rate date outside allowed range"
            );
            return Err(EngineError::RateOutOfWindow {
                rate_date: rate.rate_date,
                from: window.from,
                to: window.to,
            });
        }

        self.cache.put(rate.clone(), transaction_date);
        info!(
            request_id = ctx.log_id(),
            %currency,
            %transaction_date,
            rate_date = %rate.rate_date,
            rate = %rate.rate,
            "cached exchange rate"
        );
        Ok(rate)
    }
}
