// tests/integration_tests.rs

use chrono::NaiveDate;
use mockito::{mock, Matcher};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use stock_dashboard::config::Settings;
use stock_dashboard::error::{DataError, ProviderError};
use stock_dashboard::routes::routes;
use stock_dashboard::services::cache::CacheStore;
use stock_dashboard::services::export;
use stock_dashboard::services::market_data::MarketDataService;
use stock_dashboard::services::nse::NseSymbolSource;
use stock_dashboard::services::provider::{
    MarketDataProvider, ProviderFuture, RawPriceFrame, SymbolSource,
};
use stock_dashboard::services::retry::RetryConfig;
use stock_dashboard::services::yahoo::YahooClient;

const TIMEOUT: Duration = Duration::from_secs(5);

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn yahoo() -> YahooClient {
    let base = mockito::server_url();
    YahooClient::new(&base, &format!("{}/cookie", base), TIMEOUT).unwrap()
}

fn nse(path: &str) -> NseSymbolSource {
    NseSymbolSource::new(&format!("{}{}", mockito::server_url(), path), TIMEOUT).unwrap()
}

#[tokio::test]
async fn test_symbols_are_listed_with_suffix_and_cached() {
    let _mock = mock("GET", "/nse/EQUITY_L.csv")
        .with_status(200)
        .with_header("content-type", "text/csv")
        .with_body(
            "SYMBOL,NAME OF COMPANY, SERIES\n\
             RELIANCE,Reliance Industries Limited,EQ\n\
             TCS,Tata Consultancy Services Limited,EQ\n",
        )
        .expect(1)
        .create();

    let service = MarketDataService::new(
        Arc::new(nse("/nse/EQUITY_L.csv")),
        Arc::new(yahoo()),
        CacheStore::new(Duration::from_secs(60)),
    );

    let first = service.list_symbols().await.unwrap();
    let second = service.list_symbols().await.unwrap();

    assert_eq!(first, vec!["RELIANCE.NS", "TCS.NS"]);
    assert_eq!(first, second);
    _mock.assert();
}

#[tokio::test]
async fn test_symbol_listing_failure_is_an_error_after_retries() {
    let _mock = mock("GET", "/nse/broken.csv")
        .with_status(503)
        .expect(2)
        .create();

    let service = MarketDataService::new(
        Arc::new(nse("/nse/broken.csv")),
        Arc::new(yahoo()),
        CacheStore::disabled(),
    )
    .with_retry(RetryConfig::fixed(Duration::from_millis(1), 1));

    let err = service.list_symbols().await.unwrap_err();
    assert!(matches!(err, ProviderError::Status { status: 503, .. }));
    _mock.assert();
}

#[tokio::test]
async fn test_price_series_from_yahoo_chart() {
    let body = r#"{
        "chart": {
            "result": [{
                "meta": {"symbol": "INFY.NS", "exchangeTimezoneName": "Asia/Kolkata", "gmtoffset": 19800},
                "timestamp": [1704167100, 1704253500, 1704339900],
                "indicators": {
                    "quote": [{
                        "open": [1570.0, 1580.0, null],
                        "high": [1590.0, 1601.5, 1610.0],
                        "low": [1560.0, 1575.0, 1590.0],
                        "close": [1585.0, 1598.2, 1605.0],
                        "volume": [5100000, 6200000, 4000000]
                    }],
                    "adjclose": [{"adjclose": [1580.0, 1593.0, 1600.0]}]
                }
            }],
            "error": null
        }
    }"#;

    // 2024-01-01 and 2024-01-04 at 00:00 UTC
    let _mock = mock("GET", "/v8/finance/chart/INFY.NS")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("period1".into(), "1704067200".into()),
            Matcher::UrlEncoded("period2".into(), "1704326400".into()),
            Matcher::UrlEncoded("interval".into(), "1d".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create();

    let service = MarketDataService::new(
        Arc::new(nse("/unused.csv")),
        Arc::new(yahoo()),
        CacheStore::disabled(),
    );
    let series = service
        .get_price_series("INFY.NS", date(2024, 1, 1), date(2024, 1, 4))
        .await
        .unwrap();

    // The row with a missing open is dropped; the rest come back newest first.
    assert_eq!(series.len(), 2);
    assert_eq!(series.rows()[0].date, date(2024, 1, 3));
    assert_eq!(series.rows()[0].close, 1598.2);
    assert_eq!(series.rows()[1].date, date(2024, 1, 2));
    assert_eq!(series.rows()[1].volume, 5_100_000);

    let csv_text = export::to_csv(&series).unwrap();
    assert!(csv_text.starts_with("Date,Open,High,Low,Close,Volume\n2024-01-03,"));
}

#[tokio::test]
async fn test_unknown_symbol_chart_is_empty_series() {
    let _mock = mock("GET", "/v8/finance/chart/NOSUCH.NS")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#)
        .create();

    let service = MarketDataService::new(
        Arc::new(nse("/unused.csv")),
        Arc::new(yahoo()),
        CacheStore::disabled(),
    );
    let series = service
        .get_price_series("NOSUCH.NS", date(2024, 1, 1), date(2024, 2, 1))
        .await
        .unwrap();
    assert!(series.is_empty());
}

#[tokio::test]
async fn test_metadata_from_quote_summary() {
    let _cookie = mock("GET", "/cookie").with_status(404).create();
    let _crumb = mock("GET", "/v1/test/getcrumb")
        .with_status(200)
        .with_body("abcCrumb1")
        .create();

    let _good = mock("GET", "/v10/finance/quoteSummary/WIPRO.NS")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("crumb".into(), "abcCrumb1".into()),
            Matcher::UrlEncoded(
                "modules".into(),
                "quoteType,price,summaryDetail,financialData,defaultKeyStatistics,assetProfile".into(),
            ),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "quoteSummary": {
                    "result": [{
                        "quoteType": {"symbol": "WIPRO.NS", "longName": "Wipro Limited", "uuid": "3f2a-wipro"},
                        "summaryDetail": {
                            "fiftyTwoWeekLow": {"raw": 375.0, "fmt": "375.00"},
                            "fiftyTwoWeekHigh": {"raw": 546.1, "fmt": "546.10"},
                            "trailingPE": {"raw": 22.3, "fmt": "22.30"}
                        },
                        "financialData": {"currentPrice": {"raw": 480.5, "fmt": "480.50"}},
                        "assetProfile": {
                            "sector": "Technology",
                            "industry": "Information Technology Services",
                            "website": "https://www.wipro.com",
                            "extraKey": "ignored"
                        }
                    }],
                    "error": null
                }
            })
            .to_string(),
        )
        .create();

    let _bad = mock("GET", "/v10/finance/quoteSummary/NOPRICE.NS")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            json!({
                "quoteSummary": {
                    "result": [{
                        "quoteType": {"symbol": "NOPRICE.NS", "uuid": "0000"},
                        "summaryDetail": {"fiftyTwoWeekLow": {"raw": 1.0}, "fiftyTwoWeekHigh": {"raw": 2.0}}
                    }],
                    "error": null
                }
            })
            .to_string(),
        )
        .create();

    let service = MarketDataService::new(
        Arc::new(nse("/unused.csv")),
        Arc::new(yahoo()),
        CacheStore::disabled(),
    );

    let metadata = service.get_metadata("WIPRO.NS").await.unwrap();
    assert_eq!(metadata.uuid, "3f2a-wipro");
    assert_eq!(metadata.current_price, 480.5);
    assert_eq!(metadata.fifty_two_week_high, 546.1);
    assert_eq!(metadata.trailing_pe, 22.3);
    assert_eq!(metadata.long_name, "Wipro Limited");
    assert_eq!(metadata.sector, "Technology");
    assert_eq!(metadata.sector_key, "");

    let err = service.get_metadata("NOPRICE.NS").await.unwrap_err();
    match err {
        DataError::Validation(e) => assert_eq!(e.field(), "currentPrice"),
        other => panic!("expected a validation error, got {:?}", other),
    }
}

/// In-process provider for exercising the HTTP surface.
#[derive(Default)]
struct FakeMarket {
    symbol_calls: AtomicUsize,
    history_calls: AtomicUsize,
    profile_calls: AtomicUsize,
}

impl FakeMarket {
    fn frame(symbol: &str) -> RawPriceFrame {
        if symbol == "EMPTY.NS" {
            return RawPriceFrame::default();
        }
        RawPriceFrame::new(vec![date(2024, 6, 3), date(2024, 6, 4), date(2024, 6, 5)])
            .with_column("Open", vec![Some(100.0), Some(102.0), Some(104.0)])
            .with_column("High", vec![Some(103.0), Some(105.0), Some(107.0)])
            .with_column("Low", vec![Some(99.0), Some(101.0), Some(103.0)])
            .with_column("Close", vec![Some(100.0), Some(104.0), Some(110.0)])
            .with_column("Adj Close", vec![Some(99.5), Some(103.5), Some(109.5)])
            .with_column("Volume", vec![Some(1000.0), Some(2000.0), Some(3000.0)])
    }

    fn profile_for(symbol: &str) -> Map<String, Value> {
        let mut profile = json!({
            "uuid": format!("uuid-{}", symbol),
            "currentPrice": 110.0,
            "fiftyTwoWeekLow": 80.0,
            "fiftyTwoWeekHigh": 120.0,
            "longName": "Fake & Sons",
            "sector": "Industrials",
            "website": "https://fake.example"
        });
        if symbol == "BADMETA.NS" {
            profile["fiftyTwoWeekLow"] = json!(-5.0);
        }
        match profile {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

impl SymbolSource for FakeMarket {
    fn base_symbols(&self) -> ProviderFuture<'_, Vec<String>> {
        self.symbol_calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(vec!["ALPHA".to_string(), "BETA".to_string(), "GAMMA".to_string()]) })
    }
}

impl MarketDataProvider for FakeMarket {
    fn price_history<'a>(
        &'a self,
        symbol: &'a str,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> ProviderFuture<'a, RawPriceFrame> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move { Ok(FakeMarket::frame(symbol)) })
    }

    fn profile<'a>(&'a self, symbol: &'a str) -> ProviderFuture<'a, Map<String, Value>> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move { Ok(FakeMarket::profile_for(symbol)) })
    }
}

fn fake_routes(
    market: Arc<FakeMarket>,
) -> impl warp::Filter<Extract = impl warp::Reply, Error = std::convert::Infallible> + Clone {
    let service = MarketDataService::new(
        market.clone(),
        market,
        CacheStore::new(Duration::from_secs(60)),
    )
    .with_retry(RetryConfig::no_retry());
    routes(Arc::new(service), Arc::new(Settings::default()))
}

#[tokio::test]
async fn test_export_route_sets_attachment_name() {
    let api = fake_routes(Arc::new(FakeMarket::default()));

    let res = warp::test::request()
        .method("GET")
        .path("/api/v1/stock/ALPHA.NS/export?start=2024-06-01&end=2024-06-10")
        .reply(&api)
        .await;

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "text/csv");
    assert_eq!(
        res.headers()["content-disposition"],
        "attachment; filename=\"ALPHA.NS_stock_data.csv\""
    );
    let body = String::from_utf8(res.body().to_vec()).unwrap();
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines[0], "Date,Open,High,Low,Close,Volume");
    assert_eq!(lines[1], "2024-06-05,104.0,107.0,103.0,110.0,3000");
    assert_eq!(lines.len(), 4);
}

#[tokio::test]
async fn test_dashboard_defaults_to_clamped_symbol() {
    let market = Arc::new(FakeMarket::default());
    let api = fake_routes(market.clone());

    let res = warp::test::request().method("GET").path("/").reply(&api).await;
    assert_eq!(res.status(), 200);

    let html = String::from_utf8(res.body().to_vec()).unwrap();
    assert!(html.contains("<option value=\"GAMMA.NS\" selected>"));
    assert!(html.contains("Close Price"));
    assert!(html.contains("₹110.00"));
    assert!(html.contains("+10.00%"));
    assert!(html.contains("Stock: Fake &amp; Sons"));
    assert!(html.contains("<svg"));
    assert!(html.contains("GAMMA.NS_stock_data.csv"));
    assert_eq!(market.profile_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_empty_series_renders_no_data_page() {
    let market = Arc::new(FakeMarket::default());
    let api = fake_routes(market.clone());

    let res = warp::test::request()
        .method("GET")
        .path("/?symbol=EMPTY.NS&start=2024-06-01&end=2024-06-10&chart=Candle")
        .reply(&api)
        .await;
    assert_eq!(res.status(), 200);

    let html = String::from_utf8(res.body().to_vec()).unwrap();
    assert!(html.contains("No data for EMPTY.NS"));
    assert!(!html.contains("<table"));
    assert!(!html.contains("Close Price"));
    assert_eq!(market.profile_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_invalid_metadata_maps_to_422() {
    let api = fake_routes(Arc::new(FakeMarket::default()));

    let res = warp::test::request()
        .method("GET")
        .path("/api/v1/stock/BADMETA.NS/metadata")
        .reply(&api)
        .await;
    assert_eq!(res.status(), 422);
    let body: Value = serde_json::from_slice(res.body()).unwrap();
    assert!(body["error"].as_str().unwrap().contains("fiftyTwoWeekLow"));

    let page = warp::test::request()
        .method("GET")
        .path("/?symbol=BADMETA.NS&start=2024-06-03&end=2024-06-28&chart=candle")
        .reply(&api)
        .await;
    assert_eq!(page.status(), 422);
    let html = String::from_utf8(page.body().to_vec()).unwrap();
    assert!(html.contains("class=\"error\""));
    // The form keeps the requested range and chart after the failure.
    assert!(html.contains("name=\"start\" value=\"2024-06-03\""));
    assert!(html.contains("name=\"end\" value=\"2024-06-28\""));
    assert!(html.contains("name=\"chart\" value=\"Candle\""));
}

#[tokio::test]
async fn test_stock_snapshot_json_and_caching() {
    let market = Arc::new(FakeMarket::default());
    let api = fake_routes(market.clone());

    for _ in 0..2 {
        let res = warp::test::request()
            .method("GET")
            .path("/api/v1/stock/BETA.NS?start=2024-06-01&end=2024-06-10&chart=area")
            .reply(&api)
            .await;
        assert_eq!(res.status(), 200);

        let body: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["metadata"]["uuid"], "uuid-BETA.NS");
        assert_eq!(body["priceChange"]["absoluteDifference"], 10.0);
        assert_eq!(body["chart"]["type"], "area");
        assert_eq!(body["chart"]["x"][0], "2024-06-03");
        assert_eq!(body["rows"][0]["Date"], "2024-06-05");
    }

    // Series are memoized; metadata is always fetched fresh.
    assert_eq!(market.history_calls.load(Ordering::SeqCst), 1);
    assert_eq!(market.profile_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_symbols_and_health_routes() {
    let market = Arc::new(FakeMarket::default());
    let api = fake_routes(market.clone());

    let res = warp::test::request().path("/api/v1/symbols").reply(&api).await;
    assert_eq!(res.status(), 200);
    let symbols: Vec<String> = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(symbols, vec!["ALPHA.NS", "BETA.NS", "GAMMA.NS"]);

    let health = warp::test::request().path("/health").reply(&api).await;
    assert_eq!(health.status(), 200);
    assert_eq!(health.body().as_ref(), br#"{"status":"ok"}"#);

    let bad = warp::test::request()
        .path("/api/v1/stock/ALPHA.NS?start=yesterday")
        .reply(&api)
        .await;
    assert_eq!(bad.status(), 422);

    let missing = warp::test::request().path("/nope").reply(&api).await;
    assert_eq!(missing.status(), 404);
}

/// Provider whose calls never finish in time.
struct StalledMarket;

impl MarketDataProvider for StalledMarket {
    fn price_history<'a>(
        &'a self,
        _symbol: &'a str,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> ProviderFuture<'a, RawPriceFrame> {
        Box::pin(async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(RawPriceFrame::default())
        })
    }

    fn profile<'a>(&'a self, _symbol: &'a str) -> ProviderFuture<'a, Map<String, Value>> {
        Box::pin(async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Map::new())
        })
    }
}

#[tokio::test]
async fn test_slow_provider_calls_time_out() {
    let service = MarketDataService::new(
        Arc::new(FakeMarket::default()),
        Arc::new(StalledMarket),
        CacheStore::new(Duration::from_secs(60)),
    )
    .with_call_timeout(Duration::from_millis(50));

    let started = std::time::Instant::now();
    let err = service
        .get_price_series("SLOW.NS", date(2024, 6, 1), date(2024, 6, 10))
        .await
        .unwrap_err();
    assert_eq!(err, ProviderError::Timeout(Duration::from_millis(50)));
    assert!(started.elapsed() < Duration::from_secs(5));

    // A timed-out fetch leaves nothing in the cache.
    assert_eq!(service.cache().len().await, 0);

    let err = service.get_metadata("SLOW.NS").await.unwrap_err();
    assert!(matches!(err, DataError::Provider(ProviderError::Timeout(_))));

    let api = routes(Arc::new(service), Arc::new(Settings::default()));
    let res = warp::test::request()
        .path("/api/v1/stock/SLOW.NS/metadata")
        .reply(&api)
        .await;
    assert_eq!(res.status(), 504);
}
