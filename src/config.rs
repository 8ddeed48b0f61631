// src/config.rs
use anyhow::{Context, Result};
use chrono_tz::Tz;
use log::warn;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::services::{nse, yahoo};

/// Runtime settings, read from the environment (and `.env` via dotenv).
#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub yahoo_base_url: String,
    pub yahoo_cookie_url: String,
    pub nse_symbols_url: String,
    pub market_suffix: String,
    pub market_timezone: Tz,
    pub currency_symbol: String,
    pub default_symbol_index: usize,
    pub request_timeout: Duration,
    pub cache_ttl: Duration,
    pub max_retries: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            port: 3030,
            yahoo_base_url: yahoo::DEFAULT_BASE_URL.to_string(),
            yahoo_cookie_url: yahoo::DEFAULT_COOKIE_URL.to_string(),
            nse_symbols_url: nse::DEFAULT_SYMBOLS_URL.to_string(),
            market_suffix: ".NS".to_string(),
            market_timezone: chrono_tz::Asia::Kolkata,
            currency_symbol: "₹".to_string(),
            default_symbol_index: 20,
            request_timeout: Duration::from_secs(10),
            cache_ttl: Duration::from_secs(3600),
            max_retries: 2,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let defaults = Settings::default();
        Ok(Settings {
            port: parsed("PORT", defaults.port)?,
            yahoo_base_url: text("YAHOO_BASE_URL", defaults.yahoo_base_url),
            yahoo_cookie_url: text("YAHOO_COOKIE_URL", defaults.yahoo_cookie_url),
            nse_symbols_url: text("NSE_SYMBOLS_URL", defaults.nse_symbols_url),
            market_suffix: text("MARKET_SUFFIX", defaults.market_suffix),
            market_timezone: parsed("MARKET_TIMEZONE", defaults.market_timezone)?,
            currency_symbol: text("CURRENCY_SYMBOL", defaults.currency_symbol),
            default_symbol_index: parsed("DEFAULT_SYMBOL_INDEX", defaults.default_symbol_index)?,
            request_timeout: Duration::from_secs(parsed(
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            cache_ttl: Duration::from_secs(parsed("CACHE_TTL_SECS", defaults.cache_ttl.as_secs())?),
            max_retries: parsed("MAX_RETRIES", defaults.max_retries)?,
        })
    }
}

fn text(name: &str, default: String) -> String {
    env::var(name).unwrap_or_else(|_| {
        warn!("${} not set, defaulting to {}", name, default);
        default
    })
}

fn parsed<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr + std::fmt::Debug,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("{} must be a valid value, got {:?}", name, raw)),
        Err(_) => {
            warn!("${} not set, defaulting to {:?}", name, default);
            Ok(default)
        }
    }
}
