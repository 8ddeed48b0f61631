// src/handlers/export.rs
use log::{error, info};
use std::sync::Arc;
use warp::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use warp::http::Response;
use warp::Rejection;

use super::decode_symbol;
use super::error::ApiError;
use crate::config::Settings;
use crate::services::dashboard::{today_in, DashboardQuery};
use crate::services::export;
use crate::services::market_data::MarketDataService;

/// Streams the selected series as a CSV attachment.
pub async fn get_export(
    symbol: String,
    query: DashboardQuery,
    service: Arc<MarketDataService>,
    settings: Arc<Settings>,
) -> Result<Response<String>, Rejection> {
    info!("Handling CSV export for {}", symbol);

    let query = DashboardQuery {
        symbol: Some(decode_symbol(&symbol)),
        ..query
    };
    let today = today_in(settings.market_timezone);
    let selection = query
        .resolve(&[], settings.default_symbol_index, today)
        .map_err(|e| warp::reject::custom(ApiError::from(e)))?;

    let series = service
        .get_price_series(&selection.symbol, selection.start, selection.end)
        .await
        .map_err(|e| {
            error!("Failed to fetch prices for export of {}: {}", selection.symbol, e);
            warp::reject::custom(ApiError::from(e))
        })?;

    let body = export::to_csv(&series).map_err(|e| {
        error!("Failed to write CSV for {}: {}", selection.symbol, e);
        warp::reject::custom(ApiError::from(e))
    })?;

    Response::builder()
        .header(CONTENT_TYPE, export::CONTENT_TYPE)
        .header(
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export::file_name(&selection.symbol)),
        )
        .body(body)
        .map_err(|e| warp::reject::custom(ApiError::internal_error(e.to_string())))
}
