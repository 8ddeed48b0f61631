// src/routes.rs
use std::sync::Arc;
use warp::reject::Rejection;
use crate::config::Settings;
use crate::handlers::{
    dashboard::get_dashboard, export::get_export, stock::get_stock, stock::get_stock_metadata,
    symbols::get_symbols,
};
use crate::services::dashboard::DashboardQuery;
use crate::services::market_data::MarketDataService;
use log::{error, info};

use std::convert::Infallible;
use warp::http::StatusCode;
use warp::{Filter, Reply};
use crate::handlers::error::ApiError;

// Turn rejections into `{"error": ...}` bodies with a matching status
async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let code;
    let message;

    if err.is_not_found() {
        code = StatusCode::NOT_FOUND;
        message = "Not Found".to_string();
    } else if let Some(api_error) = err.find::<ApiError>() {
        code = api_error.status;
        message = api_error.message.clone();
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        code = StatusCode::BAD_REQUEST;
        message = e.to_string();
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        code = StatusCode::METHOD_NOT_ALLOWED;
        message = "Method Not Allowed".to_string();
    } else {
        error!("Unhandled rejection: {:?}", err);
        code = StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal Server Error".to_string();
    }

    Ok(warp::reply::with_status(
        warp::reply::json(&serde_json::json!({
            "error": message,
        })),
        code,
    ))
}

pub fn routes(
    service: Arc<MarketDataService>,
    settings: Arc<Settings>,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    info!("Configuring routes...");

    let service_filter = warp::any().map(move || service.clone());
    let settings_filter = warp::any().map(move || settings.clone());

    let dashboard_route = warp::path::end()
        .and(warp::get())
        .and(warp::query::<DashboardQuery>())
        .and(service_filter.clone())
        .and(settings_filter.clone())
        .and_then(get_dashboard);

    let health_route = warp::path!("health")
        .and(warp::get())
        .map(|| warp::reply::json(&serde_json::json!({ "status": "ok" })));

    let symbols_route = warp::path!("api" / "v1" / "symbols")
        .and(warp::get())
        .and(service_filter.clone())
        .and_then(get_symbols);

    let stock_route = warp::path!("api" / "v1" / "stock" / String)
        .and(warp::get())
        .and(warp::query::<DashboardQuery>())
        .and(service_filter.clone())
        .and(settings_filter.clone())
        .and_then(get_stock);

    let metadata_route = warp::path!("api" / "v1" / "stock" / String / "metadata")
        .and(warp::get())
        .and(service_filter.clone())
        .and_then(get_stock_metadata);

    let export_route = warp::path!("api" / "v1" / "stock" / String / "export")
        .and(warp::get())
        .and(warp::query::<DashboardQuery>())
        .and(service_filter.clone())
        .and(settings_filter.clone())
        .and_then(get_export);

    info!("All routes configured successfully.");

    dashboard_route
        .or(health_route)
        .or(symbols_route)
        .or(stock_route)
        .or(metadata_route)
        .or(export_route)
        .recover(handle_rejection)
}
