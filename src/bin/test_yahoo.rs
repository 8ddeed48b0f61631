// src/bin/test_yahoo.rs
use dotenv::dotenv;
use log::{error, info};
use std::env;

use stock_dashboard::config::Settings;
use stock_dashboard::services::calculations::price_change;
use stock_dashboard::services::dashboard::{default_start, today_in};
use stock_dashboard::services::market_data::MarketDataService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let settings = Settings::from_env()?;
    let symbol = env::args().nth(1).unwrap_or_else(|| "RELIANCE.NS".to_string());
    let service = MarketDataService::from_settings(&settings)?;

    let end = today_in(settings.market_timezone);
    let start = default_start(end);
    info!("Testing Yahoo Finance price history for {} ({} to {})...", symbol, start, end);

    let series = service.get_price_series(&symbol, start, end).await?;
    info!("SUCCESS: {} rows", series.len());
    if let Some(latest) = series.latest() {
        info!("Latest: {:?}", latest);
    }
    match price_change(&series) {
        Ok(change) => info!("Price change: {:?}", change),
        Err(e) => info!("Price change unavailable: {}", e),
    }

    match service.get_metadata(&symbol).await {
        Ok(metadata) => {
            info!(
                "SUCCESS: {} ({}), current price {}",
                metadata.long_name, metadata.sector, metadata.current_price
            );
        }
        Err(e) => {
            error!("ERROR: Failed to fetch metadata: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
