use anyhow::Error;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Strips a trailing exchange qualifier the target API does not understand.
///
/// The mapping is one-directional: callers keep the original symbol for the
/// canonical result and use the stripped form only in the outgoing request.
pub fn strip_exchange_suffix<'a>(symbol: &'a str, suffixes: &[&str]) -> &'a str {
    for suffix in suffixes {
        if let Some(stripped) = symbol.strip_suffix(suffix) {
            return stripped;
        }
    }
    symbol
}

/// Parses a price field that may be missing, non-numeric, or a zero/negative
/// sentinel for "not reported". Returns `None` in all of those cases so the
/// canonical model never carries a fabricated zero.
pub fn positive_price(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|p| *p > 0.0)
}

/// Same contract as [`positive_price`] for already-numeric payloads.
pub fn positive_price_f64(raw: Option<f64>) -> Option<f64> {
    raw.filter(|p| *p > 0.0)
}

/// Parses a volume field; zero means "not reported" on every source that
/// omits volume, so it maps to `None`.
pub fn positive_volume(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
}

pub fn positive_volume_u64(raw: Option<u64>) -> Option<u64> {
    raw.filter(|v| *v > 0)
}

/// Retries an async operation with configurable attempts and delays
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `retries`: Number of retry attempts (total runs = 1 initial + retries)
/// - `delay_ms`: Milliseconds between retry attempts
///
/// # Returns
/// Either the successful result or the error after all attempts
pub async fn with_retry<F, Fut, T>(
    mut operation: F,
    retries: usize,
    delay_ms: u64,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, reqwest::Error>>,
{
    let mut attempt = 1;
    loop {
        match operation().await.map_err(anyhow::Error::from) {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt > retries {
                    return Err(err);
                }
                debug!(
                    "Attempt {}/{} failed: {}. Retrying...",
                    attempt, retries, err
                );
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
