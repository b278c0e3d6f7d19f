use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::model::Bar;
use crate::core::{CompanyInfo, Interval, Period, Provider, Quote, Series};
use crate::providers::util::{positive_price_f64, strip_exchange_suffix, with_retry};

const EXCHANGE_SUFFIXES: &[&str] = &[".NS", ".BO"];

/// Finnhub. Requires an API key passed via the X-Finnhub-Token header.
pub struct FinnhubProvider {
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl FinnhubProvider {
    pub fn new(base_url: &str, api_key: Option<String>, timeout_secs: u64) -> Self {
        FinnhubProvider {
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

    async fn get(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<reqwest::Response> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("Requesting {}", url);

        let client = self.client()?;
        let token = self.api_key.as_deref().unwrap_or_default();
        with_retry(
            || async {
                client
                    .get(&url)
                    .header("X-Finnhub-Token", token)
                    .query(params)
                    .send()
                    .await
            },
            3,
            500,
        )
        .await
        .map_err(|e| anyhow!("Request error: {} for {}", e, url))
    }
}

// Unknown symbols come back as an all-zero payload rather than an error
#[derive(Debug, Deserialize)]
struct FinnhubQuote {
    #[serde(default)]
    c: Option<f64>, // current price
    #[serde(default)]
    o: Option<f64>,
    #[serde(default)]
    h: Option<f64>,
    #[serde(default)]
    l: Option<f64>,
    #[serde(default)]
    pc: Option<f64>, // previous close
    #[serde(default)]
    t: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct FinnhubCandles {
    s: String,
    #[serde(default)]
    t: Vec<i64>,
    #[serde(default)]
    o: Vec<f64>,
    #[serde(default)]
    h: Vec<f64>,
    #[serde(default)]
    l: Vec<f64>,
    #[serde(default)]
    c: Vec<f64>,
    #[serde(default)]
    v: Vec<u64>,
}

fn resolution_token(interval: Interval) -> &'static str {
    match interval {
        Interval::OneMinute => "1",
        Interval::FiveMinutes => "5",
        Interval::FifteenMinutes => "15",
        Interval::ThirtyMinutes => "30",
        Interval::SixtyMinutes => "60",
        Interval::OneDay => "D",
        Interval::OneWeek => "W",
        Interval::OneMonth => "M",
    }
}

#[async_trait]
impl Provider for FinnhubProvider {
    fn id(&self) -> &'static str {
        "finnhub"
    }

    fn display_name(&self) -> &str {
        "Finnhub"
    }

    fn is_available(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    #[instrument(name = "FinnhubQuote", skip(self), fields(symbol = %symbol))]
    async fn get_quote(&self, symbol: &str) -> Result<Option<Quote>> {
        let clean_symbol = strip_exchange_suffix(symbol, EXCHANGE_SUFFIXES);
        let response = self.get("quote", &[("symbol", clean_symbol)]).await?;
        let data: FinnhubQuote = response
            .json()
            .await
            .with_context(|| format!("Failed to parse Finnhub quote for {symbol}"))?;

        // Zero current price means Finnhub has no data for the symbol
        let Some(last_price) = positive_price_f64(data.c) else {
            return Ok(None);
        };

        let observed_at = data
            .t
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .unwrap_or_else(Utc::now);

        Ok(Some(Quote {
            symbol: symbol.to_string(),
            last_price: Some(last_price),
            open: positive_price_f64(data.o),
            high: positive_price_f64(data.h),
            low: positive_price_f64(data.l),
            previous_close: positive_price_f64(data.pc),
            // Volume is not part of the quote endpoint
            volume: None,
            observed_at,
        }))
    }

    #[instrument(name = "FinnhubSeries", skip(self), fields(symbol = %symbol))]
    async fn get_series(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Series> {
        let clean_symbol = strip_exchange_suffix(symbol, EXCHANGE_SUFFIXES);

        let to = Utc::now().timestamp();
        let from = to - period.approx_days() * 24 * 60 * 60;
        let from_str = from.to_string();
        let to_str = to.to_string();

        let response = self
            .get(
                "stock/candle",
                &[
                    ("symbol", clean_symbol),
                    ("resolution", resolution_token(interval)),
                    ("from", &from_str),
                    ("to", &to_str),
                ],
            )
            .await?;
        let data: FinnhubCandles = response
            .json()
            .await
            .with_context(|| format!("Failed to parse Finnhub candles for {symbol}"))?;

        if data.s != "ok" {
            return Ok(Series::empty(symbol));
        }

        let mut bars = Vec::with_capacity(data.t.len());
        for (i, ts) in data.t.iter().enumerate() {
            let Some(timestamp) = Utc.timestamp_opt(*ts, 0).single() else {
                continue;
            };
            let (Some(open), Some(high), Some(low), Some(close)) = (
                data.o.get(i).copied(),
                data.h.get(i).copied(),
                data.l.get(i).copied(),
                data.c.get(i).copied(),
            ) else {
                continue;
            };
            bars.push(Bar {
                timestamp,
                open,
                high,
                low,
                close,
                volume: data.v.get(i).copied().filter(|v| *v > 0),
            });
        }

        Ok(Series::from_bars(symbol, bars))
    }

    #[instrument(name = "FinnhubInfo", skip(self), fields(symbol = %symbol))]
    async fn get_info(&self, symbol: &str) -> Result<CompanyInfo> {
        let clean_symbol = strip_exchange_suffix(symbol, EXCHANGE_SUFFIXES);
        let response = self
            .get("stock/profile2", &[("symbol", clean_symbol)])
            .await?;
        let data: Value = response
            .json()
            .await
            .with_context(|| format!("Failed to parse Finnhub profile for {symbol}"))?;

        match data {
            Value::Object(map) => Ok(CompanyInfo::from(map)),
            _ => Ok(CompanyInfo::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(uri: &str) -> FinnhubProvider {
        FinnhubProvider::new(uri, Some("test-key".to_string()), 10)
    }

    #[test]
    fn test_availability_tracks_api_key() {
        assert!(provider("http://localhost").is_available());
        assert!(!FinnhubProvider::new("http://localhost", None, 10).is_available());
    }

    #[tokio::test]
    async fn test_successful_quote_fetch_has_no_volume() {
        let mock_server = MockServer::start().await;
        let mock_response =
            r#"{"c": 150.65, "o": 149.0, "h": 151.2, "l": 148.5, "pc": 148.2, "t": 1700000000}"#;

        Mock::given(method("GET"))
            .and(path("/quote"))
            .and(query_param("symbol", "AAPL"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server.uri());
        let quote = provider.get_quote("AAPL").await.unwrap().unwrap();
        assert_eq!(quote.last_price, Some(150.65));
        assert_eq!(quote.previous_close, Some(148.2));
        // The quote endpoint never reports volume; absent, not zero
        assert!(quote.volume.is_none());
    }

    #[tokio::test]
    async fn test_zeroed_quote_payload_is_absent() {
        let mock_server = MockServer::start().await;
        let mock_response = r#"{"c": 0, "o": 0, "h": 0, "l": 0, "pc": 0, "t": 0}"#;

        Mock::given(method("GET"))
            .and(path("/quote"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server.uri());
        let quote = provider.get_quote("BOGUS").await.unwrap();
        assert!(quote.is_none());
    }

    #[tokio::test]
    async fn test_candle_series_fetch() {
        let mock_server = MockServer::start().await;
        let mock_response = r#"{
            "s": "ok",
            "t": [1700000000, 1700086400],
            "o": [10.0, 11.0],
            "h": [10.5, 11.5],
            "l": [9.8, 10.8],
            "c": [10.2, 11.2],
            "v": [100, 200]
        }"#;

        Mock::given(method("GET"))
            .and(path("/stock/candle"))
            .and(query_param("resolution", "D"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server.uri());
        let series = provider
            .get_series("AAPL", Period::OneMonth, Interval::OneDay)
            .await
            .unwrap();
        assert_eq!(series.len(), 2);
        assert!(series.bars[0].timestamp < series.bars[1].timestamp);
        assert_eq!(series.bars[1].volume, Some(200));
    }

    #[tokio::test]
    async fn test_no_data_status_yields_empty_series() {
        let mock_server = MockServer::start().await;
        let mock_response = r#"{"s": "no_data"}"#;

        Mock::given(method("GET"))
            .and(path("/stock/candle"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server.uri());
        let series = provider
            .get_series("AAPL", Period::OneMonth, Interval::OneDay)
            .await
            .unwrap();
        assert!(series.is_empty());
    }

    #[tokio::test]
    async fn test_profile_fetch() {
        let mock_server = MockServer::start().await;
        let mock_response =
            r#"{"name": "Apple Inc", "ticker": "AAPL", "finnhubIndustry": "Technology"}"#;

        Mock::given(method("GET"))
            .and(path("/stock/profile2"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server.uri());
        let info = provider.get_info("AAPL").await.unwrap();
        assert_eq!(info.get_str("name"), Some("Apple Inc"));
    }

    #[tokio::test]
    async fn test_empty_profile_for_unknown_symbol() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stock/profile2"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server.uri());
        let info = provider.get_info("BOGUS").await.unwrap();
        assert!(info.is_empty());
    }
}
