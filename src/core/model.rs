//! Canonical data model shared by all providers

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

/// Range selector for historical series requests.
///
/// Each provider maps these to its own request vocabulary; combinations a
/// provider cannot express yield an empty series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    OneDay,
    FiveDays,
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    TwoYears,
    FiveYears,
    TenYears,
    Max,
}

impl Period {
    /// Approximate calendar span, for providers that take from/to timestamps.
    pub fn approx_days(&self) -> i64 {
        match self {
            Period::OneDay => 1,
            Period::FiveDays => 5,
            Period::OneMonth => 30,
            Period::ThreeMonths => 90,
            Period::SixMonths => 180,
            Period::OneYear => 365,
            Period::TwoYears => 365 * 2,
            Period::FiveYears => 365 * 5,
            Period::TenYears => 365 * 10,
            Period::Max => 365 * 50,
        }
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Period::OneDay => "1d",
                Period::FiveDays => "5d",
                Period::OneMonth => "1mo",
                Period::ThreeMonths => "3mo",
                Period::SixMonths => "6mo",
                Period::OneYear => "1y",
                Period::TwoYears => "2y",
                Period::FiveYears => "5y",
                Period::TenYears => "10y",
                Period::Max => "max",
            }
        )
    }
}

impl FromStr for Period {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1d" => Ok(Period::OneDay),
            "5d" => Ok(Period::FiveDays),
            "1mo" => Ok(Period::OneMonth),
            "3mo" => Ok(Period::ThreeMonths),
            "6mo" => Ok(Period::SixMonths),
            "1y" => Ok(Period::OneYear),
            "2y" => Ok(Period::TwoYears),
            "5y" => Ok(Period::FiveYears),
            "10y" => Ok(Period::TenYears),
            "max" => Ok(Period::Max),
            _ => Err(anyhow::anyhow!("Invalid period: {}", s)),
        }
    }
}

/// Bar granularity selector for historical series requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    SixtyMinutes,
    OneDay,
    OneWeek,
    OneMonth,
}

impl Interval {
    pub fn is_intraday(&self) -> bool {
        matches!(
            self,
            Interval::OneMinute
                | Interval::FiveMinutes
                | Interval::FifteenMinutes
                | Interval::ThirtyMinutes
                | Interval::SixtyMinutes
        )
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Interval::OneMinute => "1m",
                Interval::FiveMinutes => "5m",
                Interval::FifteenMinutes => "15m",
                Interval::ThirtyMinutes => "30m",
                Interval::SixtyMinutes => "60m",
                Interval::OneDay => "1d",
                Interval::OneWeek => "1wk",
                Interval::OneMonth => "1mo",
            }
        )
    }
}

impl FromStr for Interval {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1m" => Ok(Interval::OneMinute),
            "5m" => Ok(Interval::FiveMinutes),
            "15m" => Ok(Interval::FifteenMinutes),
            "30m" => Ok(Interval::ThirtyMinutes),
            "60m" | "1h" => Ok(Interval::SixtyMinutes),
            "1d" => Ok(Interval::OneDay),
            "1wk" => Ok(Interval::OneWeek),
            "1mo" => Ok(Interval::OneMonth),
            _ => Err(anyhow::anyhow!("Invalid interval: {}", s)),
        }
    }
}

/// Latest trade snapshot in the normalized shape.
///
/// `symbol` is always the caller-supplied symbol, captured before any
/// provider-local suffix rewriting. Every price field is `None` when the
/// source did not report it; a `Some(0.0)` is a true zero price, never a
/// missing-field sentinel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub last_price: Option<f64>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub previous_close: Option<f64>,
    pub volume: Option<u64>,
    pub observed_at: DateTime<Utc>,
}

impl Quote {
    pub fn new(symbol: &str) -> Self {
        Quote {
            symbol: symbol.to_string(),
            last_price: None,
            open: None,
            high: None,
            low: None,
            previous_close: None,
            volume: None,
            observed_at: Utc::now(),
        }
    }
}

/// A single OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<u64>,
}

/// Ordered historical bars for one symbol.
///
/// Bars are strictly ascending by timestamp with no duplicates. An empty
/// series means "no data available" and is distinct from a fetch error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    pub symbol: String,
    pub bars: Vec<Bar>,
}

impl Series {
    pub fn empty(symbol: &str) -> Self {
        Series {
            symbol: symbol.to_string(),
            bars: Vec::new(),
        }
    }

    /// Builds a series from bars in any order, sorting by timestamp and
    /// dropping duplicate timestamps (first occurrence wins).
    pub fn from_bars(symbol: &str, mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by_key(|b| b.timestamp);
        Series {
            symbol: symbol.to_string(),
            bars,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }
}

/// Descriptive metadata for a symbol.
///
/// Each provider exposes its own vocabulary here; fields are kept as raw
/// JSON values rather than forced into a fixed schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl CompanyInfo {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|v| v.as_str())
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for CompanyInfo {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        CompanyInfo {
            fields: map.into_iter().collect(),
        }
    }
}
