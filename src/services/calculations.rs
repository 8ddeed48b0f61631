// src/services/calculations.rs
use log::warn;

use crate::error::CalculationError;
use crate::models::{PriceChange, PriceSeries};

/// Approximate number of sessions in a trading year.
pub const TRADING_DAYS_PER_YEAR: usize = 252;

/// Compares the latest close with the close roughly one trading year back,
/// or with the oldest close when the series is shorter than that.
///
/// The series must be newest first, which `PriceSeries` guarantees.
pub fn price_change(series: &PriceSeries) -> Result<PriceChange, CalculationError> {
    let latest = series.latest().ok_or(CalculationError::EmptySeries)?.close;

    let reference_index = if series.len() > TRADING_DAYS_PER_YEAR {
        TRADING_DAYS_PER_YEAR - 1
    } else {
        series.len() - 1
    };
    let reference = series
        .get(reference_index)
        .ok_or(CalculationError::EmptySeries)?
        .close;

    if reference == 0.0 {
        warn!("Reference close at row {} is zero; skipping percentage change", reference_index);
        return Err(CalculationError::ZeroReference);
    }

    let absolute_difference = latest - reference;
    let percentage_difference = (absolute_difference / reference) * 100.0;

    Ok(PriceChange {
        absolute_difference,
        percentage_difference,
    })
}
