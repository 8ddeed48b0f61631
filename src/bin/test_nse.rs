// src/bin/test_nse.rs
use dotenv::dotenv;
use stock_dashboard::config::Settings;
use stock_dashboard::services::dashboard::default_symbol;
use stock_dashboard::services::market_data::MarketDataService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let settings = Settings::from_env()?;
    let service = MarketDataService::from_settings(&settings)?;
    let symbols = service.list_symbols().await?;

    println!("Symbols listed:   {}", symbols.len());
    println!("First ten:        {:?}", symbols.iter().take(10).collect::<Vec<_>>());
    println!("Default selection: {:?}", default_symbol(&symbols, settings.default_symbol_index));
    Ok(())
}
