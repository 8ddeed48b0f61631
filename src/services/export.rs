// src/services/export.rs
use csv::{Reader, WriterBuilder};

use crate::error::ExportError;
use crate::models::{PriceRecord, PriceSeries};

pub const CONTENT_TYPE: &str = "text/csv";

/// Download name for a symbol's export, e.g. `TCS.NS_stock_data.csv`.
pub fn file_name(symbol: &str) -> String {
    format!("{}_stock_data.csv", symbol)
}

/// Writes the series as CSV with a leading `Date` column, keeping the
/// series' newest-first order.
pub fn to_csv(series: &PriceSeries) -> Result<String, ExportError> {
    // Header written by hand so an empty series still gets one.
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    let mut header = vec![PriceSeries::INDEX];
    header.extend(PriceSeries::COLUMNS);
    wtr.write_record(&header)?;

    for record in series.rows() {
        wtr.serialize(record)?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| ExportError::Flush(e.to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Parses CSV produced by [`to_csv`] back into a series.
pub fn from_csv(text: &str) -> Result<PriceSeries, ExportError> {
    let mut rdr = Reader::from_reader(text.as_bytes());

    let headers = rdr.headers()?.clone();
    let expected: Vec<&str> = std::iter::once(PriceSeries::INDEX)
        .chain(PriceSeries::COLUMNS)
        .collect();
    if headers.iter().collect::<Vec<_>>() != expected {
        return Err(ExportError::Header(headers.iter().collect::<Vec<_>>().join(",")));
    }

    let rows = rdr
        .deserialize::<PriceRecord>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PriceSeries::new(rows))
}
