// src/services/metadata.rs
//
// Turns the provider's loose key/value profile into a `StockMetadata`.

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::models::StockMetadata;

/// Unvalidated metadata. Every field is optional; use struct-update syntax
/// for keyword-style construction or [`RawStockMetadata::from_map`] for a
/// provider mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawStockMetadata {
    pub uuid: Option<String>,
    pub current_price: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub long_name: Option<String>,
    pub symbol: Option<String>,
    pub long_business_summary: Option<String>,
    pub industry: Option<String>,
    pub industry_key: Option<String>,
    pub sector: Option<String>,
    pub sector_key: Option<String>,
    pub website: Option<String>,
}

impl RawStockMetadata {
    /// Reads fields by their provider key. Unknown keys are ignored and
    /// `null` counts as absent.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, ValidationError> {
        Ok(RawStockMetadata {
            uuid: string_field(map, "uuid")?,
            current_price: number_field(map, "currentPrice")?,
            fifty_two_week_low: number_field(map, "fiftyTwoWeekLow")?,
            fifty_two_week_high: number_field(map, "fiftyTwoWeekHigh")?,
            trailing_pe: number_field(map, "trailingPE")?,
            long_name: string_field(map, "longName")?,
            symbol: string_field(map, "symbol")?,
            long_business_summary: string_field(map, "longBusinessSummary")?,
            industry: string_field(map, "industry")?,
            industry_key: string_field(map, "industryKey")?,
            sector: string_field(map, "sector")?,
            sector_key: string_field(map, "sectorKey")?,
            website: string_field(map, "website")?,
        })
    }
}

impl StockMetadata {
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, ValidationError> {
        validate(RawStockMetadata::from_map(map)?)
    }
}

/// Checks required fields and numeric ranges, filling defaults for the
/// optional ones. Reports the first violation in field order.
pub fn validate(raw: RawStockMetadata) -> Result<StockMetadata, ValidationError> {
    let uuid = raw
        .uuid
        .ok_or(ValidationError::MissingField { field: "uuid" })?;
    let current_price = positive("currentPrice", raw.current_price)?;
    let fifty_two_week_low = positive("fiftyTwoWeekLow", raw.fifty_two_week_low)?;
    let fifty_two_week_high = positive("fiftyTwoWeekHigh", raw.fifty_two_week_high)?;

    let trailing_pe = match raw.trailing_pe {
        None => 0.0,
        Some(value) if !value.is_finite() => {
            return Err(ValidationError::OutOfRange {
                field: "trailingPE",
                value,
                constraint: "finite",
            })
        }
        Some(value) if value >= 0.0 => value,
        Some(value) => {
            return Err(ValidationError::OutOfRange {
                field: "trailingPE",
                value,
                constraint: ">= 0",
            })
        }
    };

    Ok(StockMetadata {
        uuid,
        current_price,
        fifty_two_week_low,
        fifty_two_week_high,
        trailing_pe,
        long_name: raw.long_name.unwrap_or_default(),
        symbol: raw.symbol.unwrap_or_default(),
        long_business_summary: raw.long_business_summary.unwrap_or_default(),
        industry: raw.industry.unwrap_or_default(),
        industry_key: raw.industry_key.unwrap_or_default(),
        sector: raw.sector.unwrap_or_default(),
        sector_key: raw.sector_key.unwrap_or_default(),
        website: raw.website.unwrap_or_default(),
    })
}

fn positive(field: &'static str, value: Option<f64>) -> Result<f64, ValidationError> {
    match value {
        None => Err(ValidationError::MissingField { field }),
        // "Infinity" and "NaN" parse as f64
        Some(v) if !v.is_finite() => Err(ValidationError::OutOfRange {
            field,
            value: v,
            constraint: "finite",
        }),
        Some(v) if v <= 0.0 => Err(ValidationError::OutOfRange {
            field,
            value: v,
            constraint: "> 0",
        }),
        Some(v) => Ok(v),
    }
}

fn string_field(
    map: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, ValidationError> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ValidationError::InvalidType {
            field,
            expected: "string",
        }),
    }
}

fn number_field(
    map: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<f64>, ValidationError> {
    let invalid = ValidationError::InvalidType {
        field,
        expected: "number",
    };
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_f64().map(Some).ok_or(invalid),
        Some(Value::String(s)) => s.trim().parse::<f64>().map(Some).map_err(|_| invalid),
        Some(_) => Err(invalid),
    }
}
