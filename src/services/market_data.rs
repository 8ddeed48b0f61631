// src/services/market_data.rs
//
// Data access layer: symbol list, normalized price series and validated
// metadata, with memoization, bounded retries and a call timeout.

use chrono::NaiveDate;
use log::{debug, info, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::cache::{CacheKey, CacheStore};
use super::nse::NseSymbolSource;
use super::provider::{MarketDataProvider, RawPriceFrame, SymbolSource};
use super::retry::{retry_with_backoff, RetryConfig};
use super::yahoo::YahooClient;
use crate::config::Settings;
use crate::error::{DataError, ProviderError};
use crate::models::{PriceRecord, PriceSeries, StockMetadata};

pub struct MarketDataService {
    symbols: Arc<dyn SymbolSource>,
    provider: Arc<dyn MarketDataProvider>,
    cache: CacheStore,
    retry: RetryConfig,
    call_timeout: Duration,
    market_suffix: String,
}

impl MarketDataService {
    pub fn new(
        symbols: Arc<dyn SymbolSource>,
        provider: Arc<dyn MarketDataProvider>,
        cache: CacheStore,
    ) -> Self {
        MarketDataService {
            symbols,
            provider,
            cache,
            retry: RetryConfig::default(),
            call_timeout: Duration::from_secs(30),
            market_suffix: ".NS".to_string(),
        }
    }

    /// Wires the Yahoo and NSE clients described by `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self, ProviderError> {
        let yahoo = YahooClient::new(
            &settings.yahoo_base_url,
            &settings.yahoo_cookie_url,
            settings.request_timeout,
        )?;
        let nse = NseSymbolSource::new(&settings.nse_symbols_url, settings.request_timeout)?;

        let cache = if settings.cache_ttl.is_zero() {
            CacheStore::disabled()
        } else {
            CacheStore::new(settings.cache_ttl)
        };

        // Leave room for every attempt plus backoff inside one call.
        let call_timeout =
            settings.request_timeout * (settings.max_retries + 1) + Duration::from_secs(5);

        Ok(MarketDataService::new(Arc::new(nse), Arc::new(yahoo), cache)
            .with_retry(RetryConfig {
                max_retries: settings.max_retries,
                ..RetryConfig::default()
            })
            .with_call_timeout(call_timeout)
            .with_market_suffix(&settings.market_suffix))
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_market_suffix(mut self, suffix: &str) -> Self {
        self.market_suffix = suffix.to_string();
        self
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Every tradable symbol with the market suffix appended, in upstream order.
    pub async fn list_symbols(&self) -> Result<Vec<String>, ProviderError> {
        let key = CacheKey::new("list_symbols", [&self.market_suffix]);
        self.cache
            .get_or_fetch(key, || async {
                let base = self.call(|| self.symbols.base_symbols()).await?;
                info!("Listed {} symbols", base.len());
                Ok::<_, ProviderError>(
                    base.into_iter()
                        .map(|symbol| format!("{}{}", symbol, self.market_suffix))
                        .collect::<Vec<_>>(),
                )
            })
            .await
    }

    /// Daily prices for `symbol` between `start` and `end`, newest first.
    /// An empty series means the provider had no data for the request.
    pub async fn get_price_series(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, ProviderError> {
        if start > end {
            warn!("Start date {} is after end date {}; no data to fetch", start, end);
            return Ok(PriceSeries::empty());
        }

        let key = CacheKey::new(
            "get_price_series",
            [symbol.to_string(), start.to_string(), end.to_string()],
        );
        self.cache
            .get_or_fetch(key, || async {
                let frame = self
                    .call(|| self.provider.price_history(symbol, start, end))
                    .await?;
                let series = normalize(frame)?;
                info!("Loaded {} rows for {}", series.len(), symbol);
                Ok::<_, ProviderError>(series)
            })
            .await
    }

    /// Provider profile for `symbol`, validated. Always fetched fresh.
    pub async fn get_metadata(&self, symbol: &str) -> Result<StockMetadata, DataError> {
        let profile = self.call(|| self.provider.profile(symbol)).await?;
        let metadata = StockMetadata::from_map(&profile)?;
        debug!("Validated metadata for {}", symbol);
        Ok(metadata)
    }

    async fn call<T, F, Fut>(&self, op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        tokio::time::timeout(self.call_timeout, retry_with_backoff(&self.retry, op))
            .await
            .map_err(|_| ProviderError::Timeout(self.call_timeout))?
    }
}

/// Keeps the five canonical columns under their canonical names, drops rows
/// with missing or negative values, and orders the result newest first.
pub fn normalize(frame: RawPriceFrame) -> Result<PriceSeries, ProviderError> {
    if frame.is_empty() {
        return Ok(PriceSeries::empty());
    }

    let mut columns = Vec::with_capacity(PriceSeries::COLUMNS.len());
    for name in PriceSeries::COLUMNS {
        let values = frame
            .column(name)
            .ok_or_else(|| ProviderError::Parse(format!("price data has no {} column", name)))?;
        columns.push(values);
    }

    let value = |column: usize, row: usize| -> Option<f64> {
        columns[column]
            .get(row)
            .copied()
            .flatten()
            .filter(|v| v.is_finite() && *v >= 0.0)
    };

    let mut dropped = 0;
    let mut records = Vec::with_capacity(frame.dates.len());
    for (row, &date) in frame.dates.iter().enumerate() {
        match (value(0, row), value(1, row), value(2, row), value(3, row), value(4, row)) {
            (Some(open), Some(high), Some(low), Some(close), Some(volume)) => {
                records.push(PriceRecord {
                    date,
                    open,
                    high,
                    low,
                    close,
                    volume: volume.round() as u64,
                });
            }
            _ => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!("Dropped {} incomplete price rows", dropped);
    }
    Ok(PriceSeries::new(records))
}
