use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::model::Bar;
use crate::core::{CompanyInfo, Interval, Period, Provider, Quote, Series};
use crate::providers::util::{positive_price, positive_volume, strip_exchange_suffix, with_retry};

const EXCHANGE_SUFFIXES: &[&str] = &[".NS", ".BO"];

/// Twelve Data. Requires an API key; errors arrive as 200 responses with a
/// `code`/`status` payload.
pub struct TwelveDataProvider {
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl TwelveDataProvider {
    pub fn new(base_url: &str, api_key: Option<String>, timeout_secs: u64) -> Self {
        TwelveDataProvider {
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

    async fn query(&self, endpoint: &str, symbol: &str, extra: &[(&str, &str)]) -> Result<Value> {
        let api_key = self.api_key.as_deref().unwrap_or_default();
        let mut params = vec![("symbol", symbol), ("apikey", api_key)];
        params.extend_from_slice(extra);

        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("Requesting {} from {}", endpoint, url);

        let client = self.client()?;
        let response = with_retry(
            || async { client.get(&url).query(&params).send().await },
            3,
            500,
        )
        .await
        .map_err(|e| anyhow!("Request error: {} for symbol: {}", e, symbol))?;

        response
            .json::<Value>()
            .await
            .with_context(|| format!("Failed to parse Twelve Data response for {symbol}"))
    }
}

/// Twelve Data signals failures in-band with `code >= 400`.
fn is_error_payload(data: &Value) -> bool {
    data.get("code")
        .and_then(|c| c.as_i64())
        .is_some_and(|c| c >= 400)
}

fn interval_token(interval: Interval) -> &'static str {
    match interval {
        Interval::OneMinute => "1min",
        Interval::FiveMinutes => "5min",
        Interval::FifteenMinutes => "15min",
        Interval::ThirtyMinutes => "30min",
        Interval::SixtyMinutes => "1h",
        Interval::OneDay => "1day",
        Interval::OneWeek => "1week",
        Interval::OneMonth => "1month",
    }
}

/// Bars carry "YYYY-MM-DD" for daily data and a full datetime for intraday.
fn parse_datetime(raw: &str) -> Option<chrono::DateTime<Utc>> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&dt));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
}

#[async_trait]
impl Provider for TwelveDataProvider {
    fn id(&self) -> &'static str {
        "twelvedata"
    }

    fn display_name(&self) -> &str {
        "Twelve Data"
    }

    fn is_available(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    #[instrument(name = "TwelveDataQuote", skip(self), fields(symbol = %symbol))]
    async fn get_quote(&self, symbol: &str) -> Result<Option<Quote>> {
        let clean_symbol = strip_exchange_suffix(symbol, EXCHANGE_SUFFIXES);
        let data = self.query("quote", clean_symbol, &[]).await?;

        if is_error_payload(&data) || !data.is_object() {
            return Ok(None);
        }

        let field = |key: &str| data.get(key).and_then(|v| v.as_str());
        let last_price = positive_price(field("close"));
        if last_price.is_none() {
            return Ok(None);
        }

        let observed_at = data
            .get("timestamp")
            .and_then(|v| v.as_i64())
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .unwrap_or_else(Utc::now);

        Ok(Some(Quote {
            symbol: symbol.to_string(),
            last_price,
            open: positive_price(field("open")),
            high: positive_price(field("high")),
            low: positive_price(field("low")),
            previous_close: positive_price(field("previous_close")),
            volume: positive_volume(field("volume")),
            observed_at,
        }))
    }

    #[instrument(name = "TwelveDataSeries", skip(self), fields(symbol = %symbol))]
    async fn get_series(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Series> {
        let clean_symbol = strip_exchange_suffix(symbol, EXCHANGE_SUFFIXES);
        let data = self
            .query(
                "time_series",
                clean_symbol,
                &[("interval", interval_token(interval)), ("outputsize", "5000")],
            )
            .await?;

        let Some(values) = data.get("values").and_then(|v| v.as_array()) else {
            return Ok(Series::empty(symbol));
        };

        let cutoff = Utc::now() - chrono::Duration::days(period.approx_days());
        let mut bars = Vec::new();
        for entry in values {
            let field = |key: &str| entry.get(key).and_then(|v| v.as_str());
            let Some(timestamp) = field("datetime").and_then(parse_datetime) else {
                continue;
            };
            if timestamp < cutoff {
                continue;
            }
            let (Some(open), Some(high), Some(low), Some(close)) = (
                positive_price(field("open")),
                positive_price(field("high")),
                positive_price(field("low")),
                positive_price(field("close")),
            ) else {
                continue;
            };
            bars.push(Bar {
                timestamp,
                open,
                high,
                low,
                close,
                volume: positive_volume(field("volume")),
            });
        }

        // Twelve Data returns newest-first; from_bars resorts ascending
        Ok(Series::from_bars(symbol, bars))
    }

    #[instrument(name = "TwelveDataInfo", skip(self), fields(symbol = %symbol))]
    async fn get_info(&self, symbol: &str) -> Result<CompanyInfo> {
        let clean_symbol = strip_exchange_suffix(symbol, EXCHANGE_SUFFIXES);
        let data = self.query("profile", clean_symbol, &[]).await?;

        if is_error_payload(&data) {
            return Ok(CompanyInfo::default());
        }

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

    fn provider(uri: &str) -> TwelveDataProvider {
        TwelveDataProvider::new(uri, Some("test-key".to_string()), 10)
    }

    #[test]
    fn test_availability_tracks_api_key() {
        assert!(provider("http://localhost").is_available());
        assert!(!TwelveDataProvider::new("http://localhost", None, 10).is_available());
    }

    #[tokio::test]
    async fn test_successful_quote_fetch() {
        let mock_server = MockServer::start().await;
        let mock_response = r#"{
            "symbol": "AAPL",
            "open": "149.00",
            "high": "151.20",
            "low": "148.50",
            "close": "150.65",
            "previous_close": "148.20",
            "volume": "1200345",
            "timestamp": 1700000000
        }"#;

        Mock::given(method("GET"))
            .and(path("/quote"))
            .and(query_param("symbol", "AAPL"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server.uri());
        let quote = provider.get_quote("AAPL").await.unwrap().unwrap();
        assert_eq!(quote.last_price, Some(150.65));
        assert_eq!(quote.previous_close, Some(148.20));
        assert_eq!(quote.volume, Some(1200345));
        assert_eq!(quote.observed_at.timestamp(), 1700000000);
    }

    #[tokio::test]
    async fn test_error_payload_maps_to_absent_quote() {
        let mock_server = MockServer::start().await;
        let mock_response =
            r#"{"code": 404, "message": "symbol not found", "status": "error"}"#;

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
    async fn test_series_resorted_ascending() {
        let mock_server = MockServer::start().await;
        let now = Utc::now().date_naive();
        let d1 = (now - chrono::Duration::days(2)).format("%Y-%m-%d").to_string();
        let d2 = (now - chrono::Duration::days(1)).format("%Y-%m-%d").to_string();
        // Newest first, as the API delivers
        let mock_response = format!(
            r#"{{
            "values": [
                {{"datetime": "{d2}", "open": "11.0", "high": "11.5", "low": "10.8", "close": "11.2", "volume": "200"}},
                {{"datetime": "{d1}", "open": "10.0", "high": "10.5", "low": "9.8", "close": "10.2", "volume": "100"}}
            ],
            "status": "ok"
        }}"#
        );

        Mock::given(method("GET"))
            .and(path("/time_series"))
            .and(query_param("interval", "1day"))
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
        assert_eq!(series.bars[0].close, 10.2);
    }

    #[tokio::test]
    async fn test_missing_values_yields_empty_series() {
        let mock_server = MockServer::start().await;
        let mock_response = r#"{"code": 400, "message": "bad interval", "status": "error"}"#;

        Mock::given(method("GET"))
            .and(path("/time_series"))
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
        let mock_response = r#"{"symbol": "AAPL", "name": "Apple Inc", "sector": "Technology"}"#;

        Mock::given(method("GET"))
            .and(path("/profile"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server.uri());
        let info = provider.get_info("AAPL").await.unwrap();
        assert_eq!(info.get_str("name"), Some("Apple Inc"));
    }
}
