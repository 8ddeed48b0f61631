// src/services/provider.rs
//
// Seams between the data access layer and the upstream APIs.

use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use crate::error::ProviderError;

pub type ProviderFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// Daily price table as the provider returned it: one date per row and any
/// number of named columns, each the same length as `dates`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPriceFrame {
    pub dates: Vec<NaiveDate>,
    pub columns: BTreeMap<String, Vec<Option<f64>>>,
}

impl RawPriceFrame {
    pub fn new(dates: Vec<NaiveDate>) -> Self {
        RawPriceFrame {
            dates,
            columns: BTreeMap::new(),
        }
    }

    pub fn with_column(mut self, name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        self.columns.insert(name.into(), values);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Case-insensitive column lookup.
    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
    }
}

/// Historical prices and per-symbol profiles.
pub trait MarketDataProvider: Send + Sync {
    fn price_history<'a>(
        &'a self,
        symbol: &'a str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ProviderFuture<'a, RawPriceFrame>;

    /// Flat key/value profile for a symbol.
    fn profile<'a>(&'a self, symbol: &'a str) -> ProviderFuture<'a, Map<String, Value>>;
}

/// Enumerates the exchange's tradable equities, without any market suffix.
pub trait SymbolSource: Send + Sync {
    fn base_symbols(&self) -> ProviderFuture<'_, Vec<String>>;
}
