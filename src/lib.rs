pub mod batch;
pub mod cli;
pub mod config;
pub mod core;
pub mod providers;
pub mod registry;

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::core::{Interval, Period, Provider, degrade_info, degrade_quote, degrade_series};
use crate::registry::{BASELINE_PROVIDER, ProviderRegistry};

pub enum AppCommand {
    Quote { symbols: Vec<String> },
    Series {
        symbol: String,
        period: Period,
        interval: Interval,
    },
    Info { symbol: String },
    Providers,
}

fn resolve(
    registry: &ProviderRegistry,
    config: &AppConfig,
    provider_name: Option<&str>,
) -> Arc<dyn Provider> {
    // An explicit name resolves directly; otherwise walk the fallback order
    match provider_name {
        Some(name) => registry.get_provider(config, Some(name)),
        None => registry.get_provider_with_fallback(config, None),
    }
}

pub async fn run_command(
    command: AppCommand,
    config_path: Option<&str>,
    provider_name: Option<&str>,
) -> Result<()> {
    info!("finquote starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let registry = ProviderRegistry::standard();

    match command {
        AppCommand::Quote { symbols } => {
            let provider = resolve(&registry, &config, provider_name);
            let results = batch::fetch_quotes(provider.as_ref(), &symbols).await;
            let quotes: Vec<_> = results
                .into_iter()
                .map(|(symbol, result)| {
                    let quote = degrade_quote(provider.as_ref(), &symbol, result);
                    (symbol, quote)
                })
                .collect();
            println!("{}", cli::output::render_quotes(provider.display_name(), &quotes));
        }
        AppCommand::Series {
            symbol,
            period,
            interval,
        } => {
            let provider = resolve(&registry, &config, provider_name);
            let result = provider.get_series(&symbol, period, interval).await;
            let series = degrade_series(provider.as_ref(), &symbol, result);
            println!("{}", cli::output::render_series(provider.display_name(), &series));
        }
        AppCommand::Info { symbol } => {
            let provider = resolve(&registry, &config, provider_name);
            let result = provider.get_info(&symbol).await;
            let info = degrade_info(provider.as_ref(), &symbol, result);
            println!(
                "{}",
                cli::output::render_info(provider.display_name(), &symbol, &info)
            );
        }
        AppCommand::Providers => {
            println!(
                "{}",
                cli::output::render_provider_list(&registry.ids(), BASELINE_PROVIDER)
            );
        }
    }

    Ok(())
}
