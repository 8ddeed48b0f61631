// src/services/dashboard.rs
//
// Selector resolution, the fetch -> compute pipeline behind one dashboard
// request, and the server-rendered page.

use chrono::{Months, NaiveDate, Utc};
use chrono_tz::Tz;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

use super::calculations::price_change;
use super::chart::{self, Chart};
use super::export;
use super::market_data::MarketDataService;
use crate::error::{DataError, ValidationError};
use crate::models::{ChartType, PriceChange, PriceSeries, StockMetadata};

const CHART_WIDTH: u32 = 960;
const CHART_HEIGHT: u32 = 420;

/// Raw selector values as they arrive in the query string. Blank values
/// count as absent so a cleared form field falls back to its default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardQuery {
    pub symbol: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub chart: Option<String>,
}

/// Fully resolved selectors for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub chart: ChartType,
}

/// The current calendar date in the exchange's timezone.
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// One calendar year before `today`; Feb 29 maps to Feb 28.
pub fn default_start(today: NaiveDate) -> NaiveDate {
    today.checked_sub_months(Months::new(12)).unwrap_or(today)
}

/// The entry at `index`, or the last entry when the list is shorter.
pub fn default_symbol(symbols: &[String], index: usize) -> Option<&str> {
    let last = symbols.len().checked_sub(1)?;
    symbols.get(index.min(last)).map(String::as_str)
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| ValidationError::InvalidType {
        field,
        expected: "a YYYY-MM-DD date",
    })
}

impl DashboardQuery {
    pub fn with_symbol(symbol: &str) -> Self {
        DashboardQuery {
            symbol: Some(symbol.to_string()),
            ..Default::default()
        }
    }

    pub fn resolve(
        &self,
        symbols: &[String],
        default_index: usize,
        today: NaiveDate,
    ) -> Result<Selection, ValidationError> {
        let symbol = match present(&self.symbol) {
            Some(symbol) => symbol.to_string(),
            None => default_symbol(symbols, default_index)
                .ok_or(ValidationError::MissingField { field: "symbol" })?
                .to_string(),
        };
        let start = match present(&self.start) {
            Some(raw) => parse_date("start", raw)?,
            None => default_start(today),
        };
        let end = match present(&self.end) {
            Some(raw) => parse_date("end", raw)?,
            None => today,
        };
        let chart = match present(&self.chart) {
            Some(raw) => raw.parse().map_err(|_| ValidationError::InvalidType {
                field: "chart",
                expected: "one of Line, Candle, Area",
            })?,
            None => ChartType::default(),
        };

        Ok(Selection {
            symbol,
            start,
            end,
            chart,
        })
    }
}

/// Everything one dashboard render needs. `metadata` is only looked up when
/// the series has rows; `price_change` is absent when it is undefined.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSnapshot {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub chart_type: ChartType,
    pub metadata: Option<StockMetadata>,
    pub price_change: Option<PriceChange>,
    pub chart: Chart,
    pub rows: PriceSeries,
}

impl StockSnapshot {
    pub fn has_data(&self) -> bool {
        !self.rows.is_empty()
    }
}

pub async fn load_snapshot(
    service: &MarketDataService,
    selection: &Selection,
) -> Result<StockSnapshot, DataError> {
    let series = service
        .get_price_series(&selection.symbol, selection.start, selection.end)
        .await?;

    let (metadata, change) = if series.is_empty() {
        info!(
            "No price data for {} between {} and {}",
            selection.symbol, selection.start, selection.end
        );
        (None, None)
    } else {
        let metadata = service.get_metadata(&selection.symbol).await?;
        let change = match price_change(&series) {
            Ok(change) => Some(change),
            Err(e) => {
                warn!("Price change unavailable for {}: {}", selection.symbol, e);
                None
            }
        };
        (Some(metadata), change)
    };

    Ok(StockSnapshot {
        symbol: selection.symbol.clone(),
        start: selection.start,
        end: selection.end,
        chart_type: selection.chart,
        metadata,
        price_change: change,
        chart: chart::build(&series, selection.chart),
        rows: series,
    })
}

/// What the main panel shows.
pub enum PageBody<'a> {
    Snapshot(&'a StockSnapshot),
    Error(&'a str),
}

pub struct Page<'a> {
    pub symbols: &'a [String],
    pub selection: Option<&'a Selection>,
    pub currency: &'a str,
    pub body: PageBody<'a>,
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn query_string(selection: &Selection, chart: ChartType) -> String {
    format!(
        "symbol={}&start={}&end={}&chart={}",
        urlencoding::encode(&selection.symbol),
        selection.start,
        selection.end,
        chart
    )
}

const STYLE: &str = "body{font-family:sans-serif;margin:0;display:flex;color:#262730}\
aside{width:260px;padding:1.5rem;background:#f0f2f6;min-height:100vh;box-sizing:border-box}\
aside label{display:block;margin-top:1rem;font-size:.9rem}\
aside select,aside input{width:100%;padding:.3rem;margin-top:.25rem}\
aside p{font-family:monospace;font-size:.85rem;word-break:break-all}\
main{flex:1;padding:1.5rem 2rem;overflow-x:auto}\
.tiles{display:grid;grid-template-columns:repeat(5,1fr);gap:1rem}\
.tile .label{font-size:.85rem;color:#555}.tile .value{font-size:1.8rem}\
.delta.up{color:#2ca02c}.delta.down{color:#d62728}\
.pills a{display:inline-block;padding:.25rem .8rem;margin-right:.4rem;border:1px solid #ccc;border-radius:1rem;text-decoration:none;color:inherit}\
.pills a.active{border-color:#ff4b4b;color:#ff4b4b}\
table{border-collapse:collapse;font-size:.85rem}td,th{border:1px solid #e5e5e5;padding:.2rem .6rem;text-align:right}\
.notice{padding:1rem;background:#fff3cd;border-radius:.5rem}\
.error{padding:1rem;background:#fde2e1;color:#7d1a1a;border-radius:.5rem}\
.download{display:inline-block;margin-top:1rem;padding:.5rem 1rem;border:1px solid #ccc;border-radius:.5rem;text-decoration:none;color:inherit}";

/// Renders the whole dashboard document.
pub fn render_page(page: &Page) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">");
    html.push_str("<title>Stock Dashboard</title>");
    let _ = write!(html, "<style>{}</style></head><body>", STYLE);

    render_sidebar(&mut html, page);

    html.push_str("<main><h1>📈 Stock Dashboard</h1>");
    match &page.body {
        PageBody::Error(message) => {
            let _ = write!(html, "<div class=\"error\">{}</div>", escape_html(message));
        }
        PageBody::Snapshot(snapshot) if !snapshot.has_data() => {
            let _ = write!(
                html,
                "<div class=\"notice\">No data for {} between {} and {}.</div>",
                escape_html(&snapshot.symbol),
                snapshot.start,
                snapshot.end
            );
        }
        PageBody::Snapshot(snapshot) => render_snapshot(&mut html, snapshot, page),
    }
    html.push_str("</main></body></html>");
    html
}

fn render_sidebar(html: &mut String, page: &Page) {
    let selected = page.selection.map(|s| s.symbol.as_str());

    html.push_str("<aside><form method=\"get\" action=\"/\">");
    html.push_str("<label for=\"symbol\">Select a stock symbol:</label>");
    html.push_str("<select id=\"symbol\" name=\"symbol\" onchange=\"this.form.submit()\">");
    for symbol in page.symbols {
        let escaped = escape_html(symbol);
        let marker = if Some(symbol.as_str()) == selected { " selected" } else { "" };
        let _ = write!(html, "<option value=\"{0}\"{1}>{0}</option>", escaped, marker);
    }
    html.push_str("</select>");

    let date = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();
    let _ = write!(
        html,
        "<label for=\"start\">Start Date</label><input type=\"date\" id=\"start\" name=\"start\" value=\"{}\">\
<label for=\"end\">End Date</label><input type=\"date\" id=\"end\" name=\"end\" value=\"{}\">",
        date(page.selection.map(|s| s.start)),
        date(page.selection.map(|s| s.end))
    );
    if let Some(selection) = page.selection {
        let _ = write!(
            html,
            "<input type=\"hidden\" name=\"chart\" value=\"{}\">",
            selection.chart
        );
    }
    html.push_str("<label><button type=\"submit\">Update</button></label></form>");

    if let PageBody::Snapshot(snapshot) = &page.body {
        if let Some(metadata) = &snapshot.metadata {
            let _ = write!(
                html,
                "<p>Stock: {}</p><p>Sector: {}</p><p>Website: {}</p>",
                escape_html(&metadata.long_name),
                escape_html(&metadata.sector),
                escape_html(&metadata.website)
            );
        }
    }
    html.push_str("</aside>");
}

fn tile(html: &mut String, label: &str, value: &str, delta: Option<(String, bool)>) {
    let _ = write!(
        html,
        "<div class=\"tile\"><div class=\"label\">{}</div><div class=\"value\">{}</div>",
        label,
        escape_html(value)
    );
    if let Some((text, up)) = delta {
        let _ = write!(
            html,
            "<div class=\"delta {}\">{}</div>",
            if up { "up" } else { "down" },
            text
        );
    }
    html.push_str("</div>");
}

fn render_snapshot(html: &mut String, snapshot: &StockSnapshot, page: &Page) {
    let currency = page.currency;

    if let Some(metadata) = &snapshot.metadata {
        html.push_str("<section class=\"tiles\">");
        tile(html, "Close Price", &format!("{}{:.2}", currency, metadata.current_price), None);
        match snapshot.price_change {
            Some(change) => tile(
                html,
                "Price Difference",
                &format!("{}{:.2}", currency, change.absolute_difference),
                Some((
                    format!("{:+.2}%", change.percentage_difference),
                    change.percentage_difference >= 0.0,
                )),
            ),
            None => tile(html, "Price Difference", "n/a", None),
        }
        let high = format!("{}{:.2}", currency, metadata.fifty_two_week_high);
        tile(html, "52-Week High", &high, None);
        let low = format!("{}{:.2}", currency, metadata.fifty_two_week_low);
        tile(html, "52-Week Low", &low, None);
        tile(html, "PE Ratio", &format!("{:.2}", metadata.trailing_pe), None);
        html.push_str("</section>");
    }

    html.push_str("<h2>Trend Chart</h2><nav class=\"pills\">");
    let selection = Selection {
        symbol: snapshot.symbol.clone(),
        start: snapshot.start,
        end: snapshot.end,
        chart: snapshot.chart_type,
    };
    for chart_type in ChartType::ALL {
        let _ = write!(
            html,
            "<a href=\"/?{}\"{}>{}</a>",
            escape_html(&query_string(&selection, chart_type)),
            if chart_type == snapshot.chart_type { " class=\"active\"" } else { "" },
            chart_type
        );
    }
    html.push_str("</nav>");
    html.push_str(&snapshot.chart.to_svg(CHART_WIDTH, CHART_HEIGHT));

    html.push_str("<h2>Summary</h2><table><thead><tr>");
    let _ = write!(html, "<th>{}</th>", PriceSeries::INDEX);
    for column in PriceSeries::COLUMNS {
        let _ = write!(html, "<th>{}</th>", column);
    }
    html.push_str("</tr></thead><tbody>");
    for row in snapshot.rows.rows() {
        let _ = write!(
            html,
            "<tr><td>{}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td><td>{}</td></tr>",
            row.date, row.open, row.high, row.low, row.close, row.volume
        );
    }
    html.push_str("</tbody></table>");

    let _ = write!(
        html,
        "<a class=\"download\" href=\"/api/v1/stock/{}/export?start={}&amp;end={}\" download=\"{}\">Download Stock Data Overview</a>",
        urlencoding::encode(&snapshot.symbol),
        snapshot.start,
        snapshot.end,
        escape_html(&export::file_name(&snapshot.symbol))
    );
}
