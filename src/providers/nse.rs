use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, instrument, warn};

use crate::core::{CompanyInfo, Interval, Period, Provider, Quote, Series};
use crate::providers::util::{positive_price_f64, strip_exchange_suffix, with_retry};

/// NSE India. No credential required, but the API only answers requests that
/// carry session cookies from the main site, so the provider holds a warmed
/// cookie-backed client. One instance per worker for concurrent use.
pub struct NseProvider {
    base_url: String,
    client: reqwest::Client,
    warmed: OnceCell<()>,
}

impl NseProvider {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .timeout(Duration::from_secs(timeout_secs))
            .cookie_store(true)
            .build()?;

        Ok(NseProvider {
            base_url: base_url.to_string(),
            client,
            warmed: OnceCell::new(),
        })
    }

    /// One-time session warm-up against the site root. Failures are ignored;
    /// the follow-up API call reports its own error.
    async fn ensure_session(&self) {
        self.warmed
            .get_or_init(|| async {
                debug!("Warming NSE session at {}", self.base_url);
                if let Err(e) = self.client.get(&self.base_url).send().await {
                    warn!("NSE session warm-up failed: {}", e);
                }
            })
            .await;
    }

    async fn fetch_equity(&self, symbol: &str) -> Result<Value> {
        self.ensure_session().await;

        let clean_symbol = strip_exchange_suffix(symbol, &[".NS"]);
        let url = format!("{}/api/quote-equity", self.base_url);
        debug!("Requesting equity data from {} for {}", url, clean_symbol);

        let response = with_retry(
            || async {
                self.client
                    .get(&url)
                    .query(&[("symbol", clean_symbol)])
                    .header("Accept", "application/json")
                    .header("Accept-Language", "en-US,en;q=0.9")
                    .send()
                    .await
            },
            3,
            500,
        )
        .await
        .map_err(|e| anyhow!("Request error: {} for symbol: {}", e, symbol))?;

        response
            .json::<Value>()
            .await
            .with_context(|| format!("Failed to parse NSE response for {symbol}"))
    }
}

#[async_trait]
impl Provider for NseProvider {
    fn id(&self) -> &'static str {
        "nse"
    }

    fn display_name(&self) -> &str {
        "NSE India"
    }

    fn is_available(&self) -> bool {
        // No API key needed
        true
    }

    #[instrument(name = "NseQuote", skip(self), fields(symbol = %symbol))]
    async fn get_quote(&self, symbol: &str) -> Result<Option<Quote>> {
        let data = self.fetch_equity(symbol).await?;

        let Some(price_info) = data.get("priceInfo") else {
            return Ok(None);
        };

        let price = |key: &str| positive_price_f64(price_info.get(key).and_then(|v| v.as_f64()));

        Ok(Some(Quote {
            symbol: symbol.to_string(),
            last_price: price("lastPrice"),
            open: price("open"),
            high: positive_price_f64(
                price_info
                    .pointer("/intraDayHighLow/max")
                    .and_then(|v| v.as_f64()),
            ),
            low: positive_price_f64(
                price_info
                    .pointer("/intraDayHighLow/min")
                    .and_then(|v| v.as_f64()),
            ),
            previous_close: price("previousClose").or_else(|| price("close")),
            volume: data
                .pointer("/preOpenMarket/totalTradedVolume")
                .and_then(|v| v.as_u64())
                .filter(|v| *v > 0),
            observed_at: Utc::now(),
        }))
    }

    #[instrument(name = "NseSeries", skip(self), fields(symbol = %symbol))]
    async fn get_series(
        &self,
        symbol: &str,
        _period: Period,
        _interval: Interval,
    ) -> Result<Series> {
        // The public API exposes no bulk historical endpoint
        warn!("NSE India does not serve historical data");
        Ok(Series::empty(symbol))
    }

    #[instrument(name = "NseInfo", skip(self), fields(symbol = %symbol))]
    async fn get_info(&self, symbol: &str) -> Result<CompanyInfo> {
        let data = self.fetch_equity(symbol).await?;

        match data.get("info") {
            Some(Value::Object(map)) => Ok(CompanyInfo::from(map.clone())),
            _ => Ok(CompanyInfo::default()),
        }
    }
}
