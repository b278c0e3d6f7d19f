use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf};
use tracing::debug;

/// Default fallback chain consulted when neither the config file nor the
/// environment specifies one.
pub const DEFAULT_FALLBACK_ORDER: &[&str] = &["yahoo", "twelvedata", "alphavantage"];

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EndpointConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct KeyedEndpointConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub yahoo: Option<EndpointConfig>,
    pub alphavantage: Option<KeyedEndpointConfig>,
    pub twelvedata: Option<KeyedEndpointConfig>,
    pub finnhub: Option<KeyedEndpointConfig>,
    pub nse: Option<EndpointConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: Some(EndpointConfig {
                base_url: "https://query1.finance.yahoo.com".to_string(),
            }),
            alphavantage: Some(KeyedEndpointConfig {
                base_url: "https://www.alphavantage.co".to_string(),
                api_key: None,
            }),
            twelvedata: Some(KeyedEndpointConfig {
                base_url: "https://api.twelvedata.com".to_string(),
                api_key: None,
            }),
            finnhub: Some(KeyedEndpointConfig {
                base_url: "https://finnhub.io/api/v1".to_string(),
                api_key: None,
            }),
            nse: Some(EndpointConfig {
                base_url: "https://www.nseindia.com".to_string(),
            }),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Explicit provider selection for single-provider resolution.
    #[serde(default)]
    pub provider: Option<String>,
    /// Ordered provider identifiers consulted by fallback resolution.
    #[serde(default)]
    pub fallback_order: Option<Vec<String>>,
    /// Bound on every remote call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            provider: None,
            fallback_order: None,
            timeout_secs: default_timeout_secs(),
            providers: ProvidersConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads the default config file, or plain defaults if none exists. The
    /// baseline provider needs no configuration, so a missing file is fine.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config file at {}, using defaults", config_path.display());
            let mut config = Self::default();
            config.apply_env_overrides();
            return Ok(config);
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "codito", "finquote")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let mut config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config.apply_env_overrides();
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Environment variables take precedence over the config file. Key names
    /// match the conventions of the upstream APIs.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Override application against an arbitrary key lookup, so the logic is
    /// testable without mutating process-global environment state.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("STOCK_API_PROVIDER")
            && !provider.trim().is_empty()
        {
            self.provider = Some(provider.trim().to_string());
        }

        if let Some(order) = lookup("API_FALLBACK_ORDER")
            && !order.trim().is_empty()
        {
            self.fallback_order = Some(
                order
                    .split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect(),
            );
        }

        if let Some(key) = lookup("ALPHAVANTAGE_API_KEY")
            && !key.trim().is_empty()
        {
            let entry = self
                .providers
                .alphavantage
                .get_or_insert_with(|| ProvidersConfig::default().alphavantage.unwrap());
            entry.api_key = Some(key.trim().to_string());
        }

        if let Some(key) = lookup("TWELVEDATA_API_KEY")
            && !key.trim().is_empty()
        {
            let entry = self
                .providers
                .twelvedata
                .get_or_insert_with(|| ProvidersConfig::default().twelvedata.unwrap());
            entry.api_key = Some(key.trim().to_string());
        }

        if let Some(key) = lookup("FINNHUB_API_KEY")
            && !key.trim().is_empty()
        {
            let entry = self
                .providers
                .finnhub
                .get_or_insert_with(|| ProvidersConfig::default().finnhub.unwrap());
            entry.api_key = Some(key.trim().to_string());
        }
    }

    /// Configured fallback order, or the built-in default.
    pub fn fallback_order(&self) -> Vec<String> {
        self.fallback_order
            .clone()
            .unwrap_or_else(|| DEFAULT_FALLBACK_ORDER.iter().map(|s| s.to_string()).collect())
    }
}
