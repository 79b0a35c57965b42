//! Provider registry.
//!
//! Read-only after construction, so it is shared behind an `Arc` with no locking.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use rates_types::{ConfigError, CurrencyRateProvider, ProviderError};

use crate::settings::RatesSettings;

/// Runs a provider call under a deadline; an elapsed deadline is a `Timeout`.
pub async fn call_with_timeout<T, F>(limit: Duration, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(limit)),
    }
}

/// Providers indexed by registration name.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn CurrencyRateProvider>>,
    by_name: HashMap<String, usize>,
    default: usize,
    timeout: Duration,
}

impl ProviderRegistry {
    /// Indexes `providers` and resolves the default one.
    ///
    /// An unknown default name falls back to the first registered provider.
    pub fn new(
        providers: Vec<Arc<dyn CurrencyRateProvider>>,
        settings: &RatesSettings,
    ) -> Result<Self, ConfigError> {
        if providers.is_empty() {
            return Err(ConfigError::NoProviders);
        }

        let mut by_name = HashMap::with_capacity(providers.len());
        let mut unique = Vec::with_capacity(providers.len());
        for provider in providers {
            if by_name.contains_key(provider.name()) {
                tracing::warn!(provider = provider.name(), "Duplicate provider name ignored");
                continue;
            }
            by_name.insert(provider.name().to_string(), unique.len());
            unique.push(provider);
        }
        let providers = unique;

        let default = match settings.default_provider.as_deref() {
            Some(name) => by_name.get(name).copied().unwrap_or_else(|| {
                tracing::warn!(
                    requested = name,
                    fallback = providers[0].name(),
                    "Default provider not registered, falling back"
                );
                0
            }),
            None => 0,
        };

        Ok(Self {
            providers,
            by_name,
            default,
            timeout: settings.provider_timeout,
        })
    }

    pub fn default_provider(&self) -> Arc<dyn CurrencyRateProvider> {
        self.providers[self.default].clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CurrencyRateProvider>> {
        self.by_name.get(name).map(|&i| self.providers[i].clone())
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `action` concurrently on every provider accepted by `filter`.
    ///
    /// Each call is bounded by the registry timeout. Results come back in
    /// registration order, paired with the provider name.
    pub async fn broadcast<T, P, A, F>(
        &self,
        filter: P,
        action: A,
    ) -> Vec<(String, Result<T, ProviderError>)>
    where
        P: Fn(&dyn CurrencyRateProvider) -> bool,
        A: Fn(Arc<dyn CurrencyRateProvider>) -> F,
        F: Future<Output = Result<T, ProviderError>>,
    {
        let calls = self
            .providers
            .iter()
            .filter(|p| filter(p.as_ref()))
            .map(|p| {
                let name = p.name().to_string();
                let call = call_with_timeout(self.timeout, action(p.clone()));
                async move { (name, call.await) }
            });

        join_all(calls).await
    }

    /// Fetches every provider's current table once; returns how many answered.
    #[tracing::instrument(skip(self))]
    pub async fn warm_up(&self) -> usize {
        let results = self
            .broadcast(
                |_| true,
                |provider| async move { provider.get_all_current_rates().await },
            )
            .await;

        let mut ready = 0;
        for (name, result) in results {
            match result {
                Ok(rates) => {
                    ready += 1;
                    tracing::info!(provider = %name, rates = rates.len(), "Provider warmed up");
                }
                Err(e) => tracing::warn!(provider = %name, error = %e, "Provider warm-up failed"),
            }
        }
        ready
    }
}
