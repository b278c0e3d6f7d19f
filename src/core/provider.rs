//! Provider capability contract

use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

use crate::core::model::{CompanyInfo, Interval, Period, Quote, Series};

/// One external market-data source.
///
/// All fetch operations distinguish "the remote has no data" (`Ok(None)` or
/// an empty collection) from a failed call (`Err`). Callers that want the
/// original collapse-to-empty behavior use the `degrade_*` helpers below.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Lowercase registry token, e.g. "yahoo".
    fn id(&self) -> &'static str;

    /// Human-readable name for logging and reports.
    fn display_name(&self) -> &str;

    /// Whether operating prerequisites (credentials) are met. Configuration
    /// only; never a network call.
    fn is_available(&self) -> bool;

    /// Latest trade snapshot. `Ok(None)` when the remote has no data for the
    /// symbol, never a zero-filled quote.
    async fn get_quote(&self, symbol: &str) -> Result<Option<Quote>>;

    /// Historical bars. Unsupported period/interval combinations yield an
    /// empty series rather than an error.
    async fn get_series(&self, symbol: &str, period: Period, interval: Interval)
    -> Result<Series>;

    /// Descriptive metadata; empty mapping when the remote has none.
    async fn get_info(&self, symbol: &str) -> Result<CompanyInfo>;
}

/// Collapses a failed quote fetch into "absent", logging the error.
pub fn degrade_quote(provider: &dyn Provider, symbol: &str, result: Result<Option<Quote>>) -> Option<Quote> {
    match result {
        Ok(quote) => quote,
        Err(e) => {
            warn!("{} quote error for {}: {:#}", provider.display_name(), symbol, e);
            None
        }
    }
}

/// Collapses a failed series fetch into an empty series, logging the error.
pub fn degrade_series(provider: &dyn Provider, symbol: &str, result: Result<Series>) -> Series {
    match result {
        Ok(series) => series,
        Err(e) => {
            warn!("{} series error for {}: {:#}", provider.display_name(), symbol, e);
            Series::empty(symbol)
        }
    }
}

/// Collapses a failed info fetch into an empty mapping, logging the error.
pub fn degrade_info(provider: &dyn Provider, symbol: &str, result: Result<CompanyInfo>) -> CompanyInfo {
    match result {
        Ok(info) => info,
        Err(e) => {
            warn!("{} info error for {}: {:#}", provider.display_name(), symbol, e);
            CompanyInfo::default()
        }
    }
}
