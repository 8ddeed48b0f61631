// src/services/mod.rs
pub mod cache;
pub mod calculations;
pub mod chart;
pub mod dashboard;
pub mod export;
pub mod market_data;
pub mod metadata;
pub mod nse;
pub mod provider;
pub mod retry;
pub mod yahoo;
