// src/handlers/symbols.rs
use log::{error, info};
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use super::error::ApiError;
use crate::services::market_data::MarketDataService;

pub async fn get_symbols(service: Arc<MarketDataService>) -> Result<Json, Rejection> {
    match service.list_symbols().await {
        Ok(symbols) => {
            info!("Returning {} symbols", symbols.len());
            Ok(warp::reply::json(&symbols))
        }
        Err(e) => {
            error!("Failed to list symbols: {}", e);
            Err(warp::reject::custom(ApiError::from(e)))
        }
    }
}
