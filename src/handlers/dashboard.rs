// src/handlers/dashboard.rs
use log::{error, info};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::Rejection;

use super::error::ApiError;
use crate::config::Settings;
use crate::services::dashboard::{
    load_snapshot, render_page, today_in, DashboardQuery, Page, PageBody, Selection,
};
use crate::services::market_data::MarketDataService;

/// Keeps the resolved selection, if any, so the form still shows what was asked for.
fn error_page(
    symbols: &[String],
    selection: Option<&Selection>,
    settings: &Settings,
    err: ApiError,
) -> warp::reply::WithStatus<warp::reply::Html<String>> {
    error!("Dashboard request failed: {}", err);
    let html = render_page(&Page {
        symbols,
        selection,
        currency: &settings.currency_symbol,
        body: PageBody::Error(&err.message),
    });
    warp::reply::with_status(warp::reply::html(html), err.status)
}

/// Every selector change is a fresh GET; the whole pipeline re-runs here.
pub async fn get_dashboard(
    query: DashboardQuery,
    service: Arc<MarketDataService>,
    settings: Arc<Settings>,
) -> Result<impl warp::Reply, Rejection> {
    info!("Handling dashboard request: {:?}", query);

    let symbols = match service.list_symbols().await {
        Ok(symbols) => symbols,
        Err(e) => return Ok(error_page(&[], None, &settings, e.into())),
    };

    let today = today_in(settings.market_timezone);
    let selection = match query.resolve(&symbols, settings.default_symbol_index, today) {
        Ok(selection) => selection,
        Err(e) => return Ok(error_page(&symbols, None, &settings, e.into())),
    };

    match load_snapshot(&service, &selection).await {
        Ok(snapshot) => {
            let html = render_page(&Page {
                symbols: &symbols,
                selection: Some(&selection),
                currency: &settings.currency_symbol,
                body: PageBody::Snapshot(&snapshot),
            });
            Ok(warp::reply::with_status(warp::reply::html(html), StatusCode::OK))
        }
        Err(e) => Ok(error_page(&symbols, Some(&selection), &settings, e.into())),
    }
}
