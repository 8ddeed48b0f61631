// src/handlers/mod.rs
pub mod dashboard;
pub mod error;
pub mod export;
pub mod stock;
pub mod symbols;

/// Path segments arrive percent-encoded (`M%26M.NS`).
pub(crate) fn decode_symbol(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}
