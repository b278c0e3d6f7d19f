use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::{CompanyInfo, Interval, Period, Provider, Quote, Series};
use crate::core::model::Bar;
use crate::providers::util::{positive_price_f64, positive_volume_u64, with_retry};

/// Baseline provider: no credential required, always available. Quotes and
/// series come from the chart v8 endpoint, metadata from quoteSummary.
pub struct YahooProvider {
    base_url: String,
    timeout: Duration,
}

impl YahooProvider {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        YahooProvider {
            base_url: base_url.to_string(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    fn client(&self) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .user_agent("finquote/0.2")
            .timeout(self.timeout)
            .build()?)
    }

    async fn fetch_chart(
        &self,
        symbol: &str,
        range: &str,
        interval: &str,
    ) -> Result<Option<ChartItem>> {
        let url = format!(
            "{}/v8/finance/chart/{}?interval={}&range={}",
            self.base_url, symbol, interval, range
        );
        debug!("Requesting chart data from {}", url);

        let client = self.client()?;
        let response = with_retry(|| async { client.get(&url).send().await }, 3, 500)
            .await
            .map_err(|e| anyhow!("Request error: {} for symbol: {} URL: {}", e, symbol, url))?;

        let data = response.json::<ChartResponse>().await?;
        Ok(data.chart.result.unwrap_or_default().into_iter().next())
    }
}

#[derive(Deserialize, Debug)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    // Yahoo returns result: null with an error block for unknown symbols
    result: Option<Vec<ChartItem>>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct ChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    #[serde(alias = "chartPreviousClose", alias = "previousClose")]
    previous_close: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<OhlcvArrays>,
}

#[derive(Deserialize, Debug)]
struct OhlcvArrays {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<u64>>>,
}

fn bars_from_chart(item: &ChartItem) -> Vec<Bar> {
    let (Some(timestamps), Some(ohlcv)) = (
        item.timestamp.as_ref(),
        item.indicators.as_ref().and_then(|inds| inds.quote.first()),
    ) else {
        return Vec::new();
    };

    let field = |arr: &Option<Vec<Option<f64>>>, i: usize| -> Option<f64> {
        arr.as_ref().and_then(|v| v.get(i).copied().flatten())
    };

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let Some(timestamp) = Utc.timestamp_opt(*ts, 0).single() else {
            continue;
        };
        // A bar needs a full OHLC set; Yahoo pads holidays with nulls
        let (Some(open), Some(high), Some(low), Some(close)) = (
            field(&ohlcv.open, i),
            field(&ohlcv.high, i),
            field(&ohlcv.low, i),
            field(&ohlcv.close, i),
        ) else {
            continue;
        };
        let volume = ohlcv
            .volume
            .as_ref()
            .and_then(|v| v.get(i).copied().flatten())
            .filter(|v| *v > 0);
        bars.push(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        });
    }
    bars
}

#[async_trait]
impl Provider for YahooProvider {
    fn id(&self) -> &'static str {
        "yahoo"
    }

    fn display_name(&self) -> &str {
        "Yahoo Finance"
    }

    fn is_available(&self) -> bool {
        // No API key needed
        true
    }

    #[instrument(name = "YahooQuote", skip(self), fields(symbol = %symbol))]
    async fn get_quote(&self, symbol: &str) -> Result<Option<Quote>> {
        let Some(item) = self.fetch_chart(symbol, "1d", "1d").await? else {
            return Ok(None);
        };

        let last_price = positive_price_f64(item.meta.regular_market_price);
        let bars = bars_from_chart(&item);
        let latest = bars.last();

        if last_price.is_none() && latest.is_none() {
            return Ok(None);
        }

        let observed_at = latest.map_or_else(Utc::now, |b| b.timestamp);
        Ok(Some(Quote {
            symbol: symbol.to_string(),
            last_price: last_price.or_else(|| latest.map(|b| b.close)),
            open: latest.map(|b| b.open),
            high: latest.map(|b| b.high),
            low: latest.map(|b| b.low),
            previous_close: positive_price_f64(item.meta.previous_close),
            volume: positive_volume_u64(latest.and_then(|b| b.volume)),
            observed_at,
        }))
    }

    #[instrument(name = "YahooSeries", skip(self), fields(symbol = %symbol))]
    async fn get_series(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Series> {
        // Yahoo accepts the canonical range/interval vocabulary directly
        let Some(item) = self
            .fetch_chart(symbol, &period.to_string(), &interval.to_string())
            .await?
        else {
            return Ok(Series::empty(symbol));
        };

        Ok(Series::from_bars(symbol, bars_from_chart(&item)))
    }

    #[instrument(name = "YahooInfo", skip(self), fields(symbol = %symbol))]
    async fn get_info(&self, symbol: &str) -> Result<CompanyInfo> {
        let url = format!(
            "{}/v10/finance/quoteSummary/{}?modules=assetProfile,price",
            self.base_url, symbol
        );
        debug!("Requesting company info from {}", url);

        let client = self.client()?;
        let response = with_retry(|| async { client.get(&url).send().await }, 3, 500)
            .await
            .map_err(|e| anyhow!("Request error: {} for symbol: {} URL: {}", e, symbol, url))?;

        let data = response.json::<serde_json::Value>().await?;

        let mut info = CompanyInfo::default();
        let modules = data
            .pointer("/quoteSummary/result/0")
            .and_then(|v| v.as_object());
        if let Some(modules) = modules {
            // Flatten each module's fields into one mapping
            for module in modules.values() {
                if let Some(fields) = module.as_object() {
                    for (key, value) in fields {
                        info.fields.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        Ok(info)
    }
}
