//! Configuration loading from environment.

use std::env;
use std::time::Duration;

use rates_hex::RatesSettings;
use rates_types::{ConfigError, CurrencyCode};

const DEFAULT_TRACKED: &str = "USD,EUR,GBP,CHF,JPY";
const DEFAULT_NBP_BASE_URL: &str = "https://api.nbp.pl";

/// Provider implementations the binary knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Fixed,
    Nbp,
}

impl ProviderKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Fixed => "fixed",
            ProviderKind::Nbp => "nbp",
        }
    }

    fn parse(name: &str) -> Result<Self, ConfigError> {
        match name.trim().to_lowercase().as_str() {
            "fixed" => Ok(ProviderKind::Fixed),
            "nbp" => Ok(ProviderKind::Nbp),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// SQLite URL; in-memory stores are used when absent.
    pub database_url: Option<String>,
    pub providers: Vec<ProviderKind>,
    pub nbp_base_url: String,
    pub settings: RatesSettings,
    pub refresh_interval: Option<Duration>,
    pub history_interval: Option<Duration>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = parse_or(var("PORT"), 3000, "PORT")?;

        let providers = var("RATES_PROVIDERS")
            .unwrap_or_else(|| "fixed".to_string())
            .split(',')
            .filter(|name| !name.trim().is_empty())
            .map(ProviderKind::parse)
            .collect::<Result<Vec<_>, _>>()?;
        if providers.is_empty() {
            return Err(ConfigError::NoProviders);
        }

        let tracked_currencies = var("RATES_TRACKED_CURRENCIES")
            .unwrap_or_else(|| DEFAULT_TRACKED.to_string())
            .split(',')
            .map(|code| match CurrencyCode::from_code(code) {
                CurrencyCode::Undefined => Err(ConfigError::InvalidValue("RATES_TRACKED_CURRENCIES")),
                currency => Ok(currency),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let defaults = RatesSettings::default();
        let settings = RatesSettings {
            default_provider: var("RATES_DEFAULT_PROVIDER").map(|name| name.trim().to_lowercase()),
            tracked_currencies,
            provider_timeout: Duration::from_secs(parse_or(
                var("RATES_PROVIDER_TIMEOUT_SECS"),
                defaults.provider_timeout.as_secs(),
                "RATES_PROVIDER_TIMEOUT_SECS",
            )?),
            history_window_days: parse_or(
                var("RATES_HISTORY_WINDOW_DAYS"),
                defaults.history_window_days,
                "RATES_HISTORY_WINDOW_DAYS",
            )?,
            reconcile_retries: parse_or(
                var("RATES_RECONCILE_RETRIES"),
                defaults.reconcile_retries,
                "RATES_RECONCILE_RETRIES",
            )?,
            refresh_concurrency: parse_or(
                var("RATES_REFRESH_CONCURRENCY"),
                defaults.refresh_concurrency,
                "RATES_REFRESH_CONCURRENCY",
            )?,
        };
        settings.validate()?;

        let refresh_secs: u64 = parse_or(
            var("RATES_REFRESH_INTERVAL_SECS"),
            3600,
            "RATES_REFRESH_INTERVAL_SECS",
        )?;
        let history_secs: u64 = parse_or(
            var("RATES_HISTORY_INTERVAL_SECS"),
            86_400,
            "RATES_HISTORY_INTERVAL_SECS",
        )?;

        Ok(Self {
            port,
            database_url: var("DATABASE_URL"),
            providers,
            nbp_base_url: var("NBP_BASE_URL").unwrap_or_else(|| DEFAULT_NBP_BASE_URL.to_string()),
            settings,
            refresh_interval: (refresh_secs > 0).then(|| Duration::from_secs(refresh_secs)),
            history_interval: (history_secs > 0).then(|| Duration::from_secs(history_secs)),
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    raw: Option<String>,
    default: T,
    key: &'static str,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key)),
        None => Ok(default),
    }
}
