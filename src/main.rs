use dotenv::dotenv;
use log::info;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::Filter;

use stock_dashboard::config::Settings;
use stock_dashboard::routes;
use stock_dashboard::services::market_data::MarketDataService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize the logger
    env_logger::init();
    info!("Logger initialized. Starting the application...");

    let settings = Settings::from_env()?;
    info!("Using PORT: {}", settings.port);

    // Bind to 0.0.0.0 so the dashboard is reachable from outside a container
    let addr: SocketAddr = ([0, 0, 0, 0], settings.port).into();
    info!("Will bind to: {}", addr);

    let service = Arc::new(MarketDataService::from_settings(&settings)?);
    info!(
        "Market data service ready (cache ttl {:?}, {} retries)",
        settings.cache_ttl, settings.max_retries
    );

    // Set up CORS
    let cors = warp::cors()
        .allow_any_origin()
        .allow_header("content-type")
        .allow_methods(vec!["GET"]);

    // Set up routes
    let api = routes::routes(service, Arc::new(settings)).with(cors);
    info!("Routes configured successfully with CORS.");

    // Start the server
    info!("Starting server on {}", addr);
    warp::serve(api).run(addr).await;
    Ok(())
}
