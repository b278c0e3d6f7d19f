use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::model::Bar;
use crate::core::{CompanyInfo, Interval, Period, Provider, Quote, Series};
use crate::providers::util::{positive_price, positive_volume, strip_exchange_suffix, with_retry};

const EXCHANGE_SUFFIXES: &[&str] = &[".NS", ".BO"];

/// Alpha Vantage. Requires an API key; all payload values arrive as strings.
pub struct AlphaVantageProvider {
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl AlphaVantageProvider {
    pub fn new(base_url: &str, api_key: Option<String>, timeout_secs: u64) -> Self {
        AlphaVantageProvider {
            base_url: base_url.to_string(),
            api_key,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    fn client(&self) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .user_agent("finquote/0.2")
            .timeout(self.timeout)
            .build()?)
    }

    async fn query(&self, function: &str, symbol: &str, extra: &[(&str, &str)]) -> Result<Value> {
        let api_key = self.api_key.as_deref().unwrap_or_default();
        let mut params = vec![
            ("function", function),
            ("symbol", symbol),
            ("apikey", api_key),
        ];
        params.extend_from_slice(extra);

        let url = format!("{}/query", self.base_url);
        debug!("Requesting {} from {}", function, url);

        let client = self.client()?;
        let response = with_retry(|| async { client.get(&url).query(&params).send().await }, 3, 500)
            .await
            .map_err(|e| anyhow!("Request error: {} for symbol: {}", e, symbol))?;

        response
            .json::<Value>()
            .await
            .with_context(|| format!("Failed to parse Alpha Vantage response for {symbol}"))
    }
}

fn series_key(interval: Interval) -> Option<(&'static str, &'static str)> {
    // Intraday granularities need a different endpoint tier; treat as
    // unsupported and let the caller see an empty series.
    match interval {
        Interval::OneDay => Some(("TIME_SERIES_DAILY", "Time Series (Daily)")),
        Interval::OneWeek => Some(("TIME_SERIES_WEEKLY", "Weekly Time Series")),
        Interval::OneMonth => Some(("TIME_SERIES_MONTHLY", "Monthly Time Series")),
        _ => None,
    }
}

fn parse_day(raw: &str) -> Option<chrono::DateTime<Utc>> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
}

#[async_trait]
impl Provider for AlphaVantageProvider {
    fn id(&self) -> &'static str {
        "alphavantage"
    }

    fn display_name(&self) -> &str {
        "Alpha Vantage"
    }

    fn is_available(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    #[instrument(name = "AlphaVantageQuote", skip(self), fields(symbol = %symbol))]
    async fn get_quote(&self, symbol: &str) -> Result<Option<Quote>> {
        let clean_symbol = strip_exchange_suffix(symbol, EXCHANGE_SUFFIXES);
        let data = self.query("GLOBAL_QUOTE", clean_symbol, &[]).await?;

        let Some(quote) = data.get("Global Quote").and_then(|q| q.as_object()) else {
            return Ok(None);
        };
        if quote.is_empty() {
            return Ok(None);
        }

        let field = |key: &str| quote.get(key).and_then(|v| v.as_str());

        let observed_at = field("07. latest trading day")
            .and_then(parse_day)
            .unwrap_or_else(Utc::now);

        Ok(Some(Quote {
            symbol: symbol.to_string(),
            last_price: positive_price(field("05. price")),
            open: positive_price(field("02. open")),
            high: positive_price(field("03. high")),
            low: positive_price(field("04. low")),
            previous_close: positive_price(field("08. previous close")),
            volume: positive_volume(field("06. volume")),
            observed_at,
        }))
    }

    #[instrument(name = "AlphaVantageSeries", skip(self), fields(symbol = %symbol))]
    async fn get_series(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Series> {
        let Some((function, payload_key)) = series_key(interval) else {
            debug!("Interval {} not supported by Alpha Vantage", interval);
            return Ok(Series::empty(symbol));
        };

        let clean_symbol = strip_exchange_suffix(symbol, EXCHANGE_SUFFIXES);
        let data = self
            .query(function, clean_symbol, &[("outputsize", "full")])
            .await?;

        let Some(entries) = data.get(payload_key).and_then(|v| v.as_object()) else {
            return Ok(Series::empty(symbol));
        };

        let cutoff = Utc::now() - chrono::Duration::days(period.approx_days());
        let mut bars = Vec::new();
        for (date_str, fields) in entries {
            let Some(timestamp) = parse_day(date_str) else {
                continue;
            };
            if timestamp < cutoff {
                continue;
            }
            let field = |key: &str| fields.get(key).and_then(|v| v.as_str());
            let (Some(open), Some(high), Some(low), Some(close)) = (
                positive_price(field("1. open")),
                positive_price(field("2. high")),
                positive_price(field("3. low")),
                positive_price(field("4. close")),
            ) else {
                continue;
            };
            bars.push(Bar {
                timestamp,
                open,
                high,
                low,
                close,
                volume: positive_volume(field("5. volume")),
            });
        }

        Ok(Series::from_bars(symbol, bars))
    }

    #[instrument(name = "AlphaVantageInfo", skip(self), fields(symbol = %symbol))]
    async fn get_info(&self, symbol: &str) -> Result<CompanyInfo> {
        let clean_symbol = strip_exchange_suffix(symbol, EXCHANGE_SUFFIXES);
        let data = self.query("OVERVIEW", clean_symbol, &[]).await?;

        match data {
            Value::Object(map) => Ok(CompanyInfo::from(map)),
            _ => Ok(CompanyInfo::default()),
        }
    }
}
