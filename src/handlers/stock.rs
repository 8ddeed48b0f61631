// src/handlers/stock.rs
use log::{debug, error, info};
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use super::decode_symbol;
use super::error::ApiError;
use crate::config::Settings;
use crate::services::dashboard::{load_snapshot, today_in, DashboardQuery};
use crate::services::market_data::MarketDataService;

/// JSON counterpart of the dashboard page for one symbol.
pub async fn get_stock(
    symbol: String,
    query: DashboardQuery,
    service: Arc<MarketDataService>,
    settings: Arc<Settings>,
) -> Result<Json, Rejection> {
    info!("Handling stock snapshot request for {}", symbol);

    let query = DashboardQuery {
        symbol: Some(decode_symbol(&symbol)),
        ..query
    };
    let today = today_in(settings.market_timezone);
    let selection = query
        .resolve(&[], settings.default_symbol_index, today)
        .map_err(|e| {
            error!("Invalid stock query: {}", e);
            warp::reject::custom(ApiError::from(e))
        })?;

    match load_snapshot(&service, &selection).await {
        Ok(snapshot) => {
            debug!("Snapshot for {} has {} rows", selection.symbol, snapshot.rows.len());
            Ok(warp::reply::json(&snapshot))
        }
        Err(e) => {
            error!("Failed to load {}: {}", selection.symbol, e);
            Err(warp::reject::custom(ApiError::from(e)))
        }
    }
}

pub async fn get_stock_metadata(
    symbol: String,
    service: Arc<MarketDataService>,
) -> Result<Json, Rejection> {
    let symbol = decode_symbol(&symbol);
    info!("Handling metadata request for {}", symbol);
    match service.get_metadata(&symbol).await {
        Ok(metadata) => Ok(warp::reply::json(&metadata)),
        Err(e) => {
            error!("Failed to fetch metadata for {}: {}", symbol, e);
            Err(warp::reject::custom(ApiError::from(e)))
        }
    }
}
