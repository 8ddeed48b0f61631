// src/services/nse.rs
use csv::Reader;
use log::{error, info};
use reqwest::Client;
use std::time::Duration;

use super::provider::{ProviderFuture, SymbolSource};
use crate::error::ProviderError;

pub const DEFAULT_SYMBOLS_URL: &str = "https://archives.nseindia.com/content/equities/EQUITY_L.csv";

/// NSE rejects requests without a browser user agent.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Lists NSE equities from the exchange's published CSV.
pub struct NseSymbolSource {
    client: Client,
    url: String,
}

impl NseSymbolSource {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(NseSymbolSource {
            client,
            url: url.to_string(),
        })
    }

    pub async fn fetch_symbols(&self) -> Result<Vec<String>, ProviderError> {
        info!("Fetching NSE equity list from URL: {}", self.url);

        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            error!("NSE equity list request failed with status {}", status);
            return Err(ProviderError::Status {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        let csv_text = response.text().await?;
        let symbols = parse_symbol_csv(&csv_text)?;
        info!("Found {} NSE symbols", symbols.len());
        Ok(symbols)
    }
}

impl SymbolSource for NseSymbolSource {
    fn base_symbols(&self) -> ProviderFuture<'_, Vec<String>> {
        Box::pin(self.fetch_symbols())
    }
}

/// Reads the `SYMBOL` column of the equity list, in file order.
pub fn parse_symbol_csv(csv_text: &str) -> Result<Vec<String>, ProviderError> {
    let mut rdr = Reader::from_reader(csv_text.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|e| ProviderError::Parse(format!("unreadable equity list header: {}", e)))?
        .clone();
    let idx_symbol = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("SYMBOL"))
        .ok_or_else(|| ProviderError::Parse("No 'SYMBOL' column in equity list".into()))?;

    let mut symbols = Vec::new();
    for record in rdr.records() {
        let row = record.map_err(|e| ProviderError::Parse(format!("bad equity list row: {}", e)))?;
        if let Some(cell) = row.get(idx_symbol).map(str::trim).filter(|c| !c.is_empty()) {
            symbols.push(cell.to_string());
        }
    }
    Ok(symbols)
}
