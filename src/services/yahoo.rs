// src/services/yahoo.rs
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use log::{debug, info, warn};
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::sync::Mutex;

use super::provider::{MarketDataProvider, ProviderFuture, RawPriceFrame};
use crate::error::ProviderError;

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_COOKIE_URL: &str = "https://fc.yahoo.com";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// quoteSummary modules, in the order their keys take precedence.
const PROFILE_MODULES: [&str; 6] = [
    "quoteType",
    "price",
    "summaryDetail",
    "financialData",
    "defaultKeyStatistics",
    "assetProfile",
];

/// Yahoo Finance chart and quoteSummary client.
pub struct YahooClient {
    client: Client,
    base_url: String,
    cookie_url: String,
    crumb: Mutex<Option<String>>,
}

impl YahooClient {
    pub fn new(base_url: &str, cookie_url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .timeout(timeout)
            .build()?;

        Ok(YahooClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cookie_url: cookie_url.to_string(),
            crumb: Mutex::new(None),
        })
    }

    pub async fn fetch_chart(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawPriceFrame, ProviderError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, urlencoding::encode(symbol));
        // period2 is exclusive on Yahoo's side
        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = end.and_time(NaiveTime::MIN).and_utc().timestamp();
        info!("Fetching daily chart for {} ({} to {})", symbol, start, end);

        let response = self
            .client
            .get(&url)
            .header(header::REFERER, "https://finance.yahoo.com/")
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("includeAdjustedClose", "true".to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            info!("Yahoo has no chart for {}; treating as no data", symbol);
            return Ok(RawPriceFrame::default());
        }
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                url,
            });
        }

        parse_chart(&body)
    }

    pub async fn fetch_profile(&self, symbol: &str) -> Result<Map<String, Value>, ProviderError> {
        match self.quote_summary(symbol).await {
            Err(ProviderError::Status { status: 401, .. }) => {
                warn!("Yahoo rejected the crumb for {}; refreshing once", symbol);
                self.invalidate_crumb().await;
                self.quote_summary(symbol).await
            }
            other => other,
        }
    }

    async fn quote_summary(&self, symbol: &str) -> Result<Map<String, Value>, ProviderError> {
        let crumb = self.crumb().await?;
        let url = format!(
            "{}/v10/finance/quoteSummary/{}",
            self.base_url,
            urlencoding::encode(symbol)
        );
        info!("Fetching profile for {}", symbol);

        let response = self
            .client
            .get(&url)
            .header(header::REFERER, "https://finance.yahoo.com/")
            .query(&[("modules", PROFILE_MODULES.join(",")), ("crumb", crumb)])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(symbol.to_string()));
        }
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                url,
            });
        }

        parse_quote_summary(symbol, &body)
    }

    async fn crumb(&self) -> Result<String, ProviderError> {
        let mut cached = self.crumb.lock().await;
        if let Some(crumb) = cached.as_ref() {
            return Ok(crumb.clone());
        }

        // Only the session cookie matters here; the status is usually 404.
        if let Err(e) = self.client.get(&self.cookie_url).send().await {
            debug!("Cookie request to {} failed: {}", self.cookie_url, e);
        }

        let url = format!("{}/v1/test/getcrumb", self.base_url);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let crumb = body.trim();
        if crumb.is_empty()
            || crumb.len() >= 100
            || crumb.contains(char::is_whitespace)
            || crumb.contains('<')
        {
            return Err(ProviderError::Parse("Yahoo returned an unusable crumb".into()));
        }

        debug!("Obtained Yahoo crumb");
        *cached = Some(crumb.to_string());
        Ok(crumb.to_string())
    }

    async fn invalidate_crumb(&self) {
        *self.crumb.lock().await = None;
    }
}

impl MarketDataProvider for YahooClient {
    fn price_history<'a>(
        &'a self,
        symbol: &'a str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ProviderFuture<'a, RawPriceFrame> {
        Box::pin(self.fetch_chart(symbol, start, end))
    }

    fn profile<'a>(&'a self, symbol: &'a str) -> ProviderFuture<'a, Map<String, Value>> {
        Box::pin(self.fetch_profile(symbol))
    }
}

#[derive(Debug, Deserialize)]
struct YahooApiError {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

impl YahooApiError {
    fn is_not_found(&self) -> bool {
        self.code.eq_ignore_ascii_case("Not Found")
    }

    fn message(&self) -> String {
        match &self.description {
            Some(description) => format!("{}: {}", self.code, description),
            None => self.code.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    exchange_timezone_name: Option<String>,
    #[serde(default)]
    gmtoffset: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<QuoteIndicator>,
    #[serde(default)]
    adjclose: Vec<AdjCloseIndicator>,
}

#[derive(Debug, Deserialize)]
struct QuoteIndicator {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseIndicator {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// Parses a `v8/finance/chart` body into a frame with every column Yahoo
/// sent, `adjclose` included. A "Not Found" error or a result without
/// timestamps is an empty frame.
pub fn parse_chart(body: &str) -> Result<RawPriceFrame, ProviderError> {
    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Parse(format!("failed to parse yahoo chart: {}", e)))?;

    if let Some(error) = response.chart.error {
        if error.is_not_found() {
            return Ok(RawPriceFrame::default());
        }
        return Err(ProviderError::Parse(format!("yahoo chart error: {}", error.message())));
    }

    let result = match response.chart.result.and_then(|r| r.into_iter().next()) {
        Some(result) => result,
        None => return Ok(RawPriceFrame::default()),
    };
    let timestamps = match result.timestamp {
        Some(ts) if !ts.is_empty() => ts,
        _ => return Ok(RawPriceFrame::default()),
    };

    let dates = timestamps
        .iter()
        .map(|&ts| exchange_date(ts, &result.meta))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| ProviderError::Parse("invalid timestamp in yahoo chart".into()))?;

    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Parse("yahoo chart has no quote indicators".into()))?;

    let mut frame = RawPriceFrame::new(dates)
        .with_column("open", quote.open)
        .with_column("high", quote.high)
        .with_column("low", quote.low)
        .with_column("close", quote.close)
        .with_column("volume", quote.volume);
    if let Some(adj) = result.indicators.adjclose.into_iter().next() {
        frame = frame.with_column("adjclose", adj.adjclose);
    }
    Ok(frame)
}

/// Trading date of a bar in the exchange's own timezone.
fn exchange_date(timestamp: i64, meta: &ChartMeta) -> Option<NaiveDate> {
    let instant: DateTime<Utc> = DateTime::from_timestamp(timestamp, 0)?;

    if let Some(tz) = meta
        .exchange_timezone_name
        .as_deref()
        .and_then(|name| name.parse::<Tz>().ok())
    {
        return Some(instant.with_timezone(&tz).date_naive());
    }
    if let Some(offset) = meta.gmtoffset.and_then(FixedOffset::east_opt) {
        return Some(instant.with_timezone(&offset).date_naive());
    }
    Some(instant.date_naive())
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryEnvelope,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryEnvelope {
    #[serde(default)]
    result: Option<Vec<Map<String, Value>>>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

pub fn parse_quote_summary(symbol: &str, body: &str) -> Result<Map<String, Value>, ProviderError> {
    let response: QuoteSummaryResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Parse(format!("failed to parse yahoo profile: {}", e)))?;

    if let Some(error) = response.quote_summary.error {
        if error.is_not_found() {
            return Err(ProviderError::NotFound(symbol.to_string()));
        }
        return Err(ProviderError::Parse(format!("yahoo profile error: {}", error.message())));
    }

    response
        .quote_summary
        .result
        .and_then(|r| r.into_iter().next())
        .map(|modules| flatten_modules(&modules))
        .ok_or_else(|| ProviderError::NotFound(symbol.to_string()))
}

/// Merges the quoteSummary modules into one flat map. `{"raw": x, "fmt": ..}`
/// wrappers collapse to `x`; wrappers without a raw value are dropped.
pub fn flatten_modules(modules: &Map<String, Value>) -> Map<String, Value> {
    let mut flat = Map::new();
    for module in PROFILE_MODULES {
        let fields = match modules.get(module) {
            Some(Value::Object(fields)) => fields,
            _ => continue,
        };
        for (key, value) in fields {
            if flat.contains_key(key) {
                continue;
            }
            let value = match value {
                Value::Object(wrapper) => match wrapper.get("raw") {
                    Some(raw) => raw.clone(),
                    None => continue,
                },
                Value::Null => continue,
                other => other.clone(),
            };
            flat.insert(key.clone(), value);
        }
    }
    flat
}
