// src/models.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One trading day of OHLCV data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Open")]
    pub open: f64,
    #[serde(rename = "High")]
    pub high: f64,
    #[serde(rename = "Low")]
    pub low: f64,
    #[serde(rename = "Close")]
    pub close: f64,
    #[serde(rename = "Volume")]
    pub volume: u64,
}

/// Price history for one symbol, newest first.
///
/// Dates are unique and strictly descending; the only way to build one is
/// through [`PriceSeries::new`], which sorts and de-duplicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<PriceRecord>", into = "Vec<PriceRecord>")]
pub struct PriceSeries {
    rows: Vec<PriceRecord>,
}

impl From<Vec<PriceRecord>> for PriceSeries {
    fn from(rows: Vec<PriceRecord>) -> Self {
        PriceSeries::new(rows)
    }
}

impl From<PriceSeries> for Vec<PriceRecord> {
    fn from(series: PriceSeries) -> Self {
        series.rows
    }
}

impl PriceSeries {
    pub const COLUMNS: [&'static str; 5] = ["Open", "High", "Low", "Close", "Volume"];
    pub const INDEX: &'static str = "Date";

    /// Builds a series from rows in any order. When two rows share a date the
    /// one that appears later in `rows` is kept.
    pub fn new(rows: impl IntoIterator<Item = PriceRecord>) -> Self {
        let by_date: BTreeMap<NaiveDate, PriceRecord> =
            rows.into_iter().map(|row| (row.date, row)).collect();
        PriceSeries {
            rows: by_date.into_values().rev().collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[PriceRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn latest(&self) -> Option<&PriceRecord> {
        self.rows.first()
    }

    pub fn get(&self, index: usize) -> Option<&PriceRecord> {
        self.rows.get(index)
    }

    /// Rows oldest first, the order charts plot them in.
    pub fn chronological(&self) -> impl Iterator<Item = &PriceRecord> {
        self.rows.iter().rev()
    }
}

/// Validated per-symbol profile. Build it with
/// [`crate::services::metadata::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMetadata {
    pub uuid: String,
    pub current_price: f64,
    pub fifty_two_week_low: f64,
    pub fifty_two_week_high: f64,
    #[serde(rename = "trailingPE")]
    pub trailing_pe: f64,
    pub long_name: String,
    pub symbol: String,
    pub long_business_summary: String,
    pub industry: String,
    pub industry_key: String,
    pub sector: String,
    pub sector_key: String,
    pub website: String,
}

/// Year-over-year change in closing price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceChange {
    pub absolute_difference: f64,
    pub percentage_difference: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChartType {
    #[default]
    Line,
    Candle,
    Area,
}

impl ChartType {
    pub const ALL: [ChartType; 3] = [ChartType::Line, ChartType::Candle, ChartType::Area];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Line => "Line",
            ChartType::Candle => "Candle",
            ChartType::Area => "Area",
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "line" => Ok(ChartType::Line),
            "candle" | "candlestick" => Ok(ChartType::Candle),
            "area" => Ok(ChartType::Area),
            other => Err(format!("unknown chart type: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(day: u32, close: f64) -> PriceRecord {
        PriceRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 100,
        }
    }

    #[test]
    fn series_sorts_newest_first_and_drops_duplicate_dates() {
        let series = PriceSeries::new(vec![
            record(2, 10.0),
            record(5, 11.0),
            record(3, 12.0),
            record(5, 13.0),
        ]);

        let dates: Vec<u32> = series
            .rows()
            .iter()
            .map(|r| chrono::Datelike::day(&r.date))
            .collect();
        assert_eq!(dates, vec![5, 3, 2]);
        assert_eq!(series.latest().unwrap().close, 13.0);
    }

    #[test]
    fn chronological_iterates_oldest_first() {
        let series = PriceSeries::new(vec![record(1, 1.0), record(2, 2.0)]);
        let closes: Vec<f64> = series.chronological().map(|r| r.close).collect();
        assert_eq!(closes, vec![1.0, 2.0]);
    }

    #[test]
    fn chart_type_parses_case_insensitively() {
        assert_eq!("candle".parse::<ChartType>().unwrap(), ChartType::Candle);
        assert_eq!("AREA".parse::<ChartType>().unwrap(), ChartType::Area);
        assert!("pie".parse::<ChartType>().is_err());
        assert_eq!(ChartType::default(), ChartType::Line);
    }
}
