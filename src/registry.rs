//! Provider registry and fallback resolution

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::core::Provider;
use crate::providers::alpha_vantage::AlphaVantageProvider;
use crate::providers::finnhub::FinnhubProvider;
use crate::providers::nse::NseProvider;
use crate::providers::twelve_data::TwelveDataProvider;
use crate::providers::yahoo::YahooProvider;

/// The no-credential provider every resolution terminates at.
pub const BASELINE_PROVIDER: &str = "yahoo";

type Constructor = fn(&AppConfig) -> Result<Arc<dyn Provider>>;

fn build_yahoo(config: &AppConfig) -> YahooProvider {
    let base_url = config
        .providers
        .yahoo
        .as_ref()
        .map_or("https://query1.finance.yahoo.com", |p| &p.base_url);
    YahooProvider::new(base_url, config.timeout_secs)
}

fn yahoo(config: &AppConfig) -> Result<Arc<dyn Provider>> {
    Ok(Arc::new(build_yahoo(config)))
}

fn alphavantage(config: &AppConfig) -> Result<Arc<dyn Provider>> {
    let (base_url, api_key) = config
        .providers
        .alphavantage
        .as_ref()
        .map_or(("https://www.alphavantage.co", None), |p| {
            (p.base_url.as_str(), p.api_key.clone())
        });
    Ok(Arc::new(AlphaVantageProvider::new(
        base_url,
        api_key,
        config.timeout_secs,
    )))
}

fn twelvedata(config: &AppConfig) -> Result<Arc<dyn Provider>> {
    let (base_url, api_key) = config
        .providers
        .twelvedata
        .as_ref()
        .map_or(("https://api.twelvedata.com", None), |p| {
            (p.base_url.as_str(), p.api_key.clone())
        });
    Ok(Arc::new(TwelveDataProvider::new(
        base_url,
        api_key,
        config.timeout_secs,
    )))
}

fn finnhub(config: &AppConfig) -> Result<Arc<dyn Provider>> {
    let (base_url, api_key) = config
        .providers
        .finnhub
        .as_ref()
        .map_or(("https://finnhub.io/api/v1", None), |p| {
            (p.base_url.as_str(), p.api_key.clone())
        });
    Ok(Arc::new(FinnhubProvider::new(
        base_url,
        api_key,
        config.timeout_secs,
    )))
}

fn nse(config: &AppConfig) -> Result<Arc<dyn Provider>> {
    let base_url = config
        .providers
        .nse
        .as_ref()
        .map_or("https://www.nseindia.com", |p| &p.base_url);
    Ok(Arc::new(NseProvider::new(base_url, config.timeout_secs)?))
}

/// Immutable identifier-to-constructor mapping, built once at process start
/// and shared by reference across resolution calls.
pub struct ProviderRegistry {
    entries: Vec<(&'static str, Constructor)>,
}

impl ProviderRegistry {
    /// The full set of built-in providers.
    pub fn standard() -> Self {
        ProviderRegistry {
            entries: vec![
                ("yahoo", yahoo as Constructor),
                ("alphavantage", alphavantage as Constructor),
                ("twelvedata", twelvedata as Constructor),
                ("finnhub", finnhub as Constructor),
                ("nse", nse as Constructor),
            ],
        }
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }

    fn lookup(&self, name: &str) -> Option<Constructor> {
        let token = name.trim().to_lowercase();
        self.entries
            .iter()
            .find(|(id, _)| *id == token)
            .map(|(_, ctor)| *ctor)
    }

    /// The baseline provider never needs credentials and its construction
    /// cannot fail, so resolution always has somewhere to land.
    fn baseline(&self, config: &AppConfig) -> Arc<dyn Provider> {
        Arc::new(build_yahoo(config))
    }

    /// Resolves a single named provider (or the configured/default one).
    /// Unknown identifiers and unavailable providers substitute the baseline
    /// with a warning; this call always returns a usable provider.
    pub fn get_provider(&self, config: &AppConfig, name: Option<&str>) -> Arc<dyn Provider> {
        let requested = name
            .or(config.provider.as_deref())
            .unwrap_or(BASELINE_PROVIDER);

        let Some(constructor) = self.lookup(requested) else {
            warn!(
                "Unknown provider: {}, falling back to {}",
                requested, BASELINE_PROVIDER
            );
            return self.baseline(config);
        };

        let provider = match constructor(config) {
            Ok(provider) => provider,
            Err(e) => {
                warn!(
                    "Failed to construct provider {}: {:#}, falling back to {}",
                    requested, e, BASELINE_PROVIDER
                );
                return self.baseline(config);
            }
        };

        if !provider.is_available() {
            warn!(
                "{} is not available, falling back to {}",
                provider.display_name(),
                BASELINE_PROVIDER
            );
            return self.baseline(config);
        }

        info!("Using API provider: {}", provider.display_name());
        provider
    }

    /// Walks the ordered candidate list (or the configured default order) and
    /// returns the first available provider. Declaration order is the only
    /// priority. Exhaustion lands on the baseline; this call never fails.
    pub fn get_provider_with_fallback(
        &self,
        config: &AppConfig,
        order: Option<&[String]>,
    ) -> Arc<dyn Provider> {
        let configured;
        let order = match order {
            Some(order) => order,
            None => {
                configured = config.fallback_order();
                configured.as_slice()
            }
        };

        for name in order {
            let Some(constructor) = self.lookup(name) else {
                warn!("Unknown provider in fallback order: {}", name);
                continue;
            };
            let provider = match constructor(config) {
                Ok(provider) => provider,
                Err(e) => {
                    warn!("Failed to initialize {}: {:#}", name, e);
                    continue;
                }
            };
            if provider.is_available() {
                info!("Using API provider: {}", provider.display_name());
                return provider;
            }
            debug!("{} is not available, trying next", provider.display_name());
        }

        warn!(
            "No provider in fallback order is available, using {}",
            BASELINE_PROVIDER
        );
        self.baseline(config)
    }
}
