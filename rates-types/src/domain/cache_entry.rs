//! Materialized exchange rate cache record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::currency::CurrencyCode;
use super::provider::ProviderType;
use super::rate::CurrencyRate;
use crate::error::DomainError;

/// Namespace for deriving cache entry ids.
const CACHE_ENTRY_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2d3e_8a4b_4c5d_9e6f_7a8b_9c0d_1e2f);

/// Identifier of a cache entry.
///
/// Derived from currency and date, so the same pair always maps to the same id
/// and repeated writes overwrite instead of duplicating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheEntryId(Uuid);

impl CacheEntryId {
    /// Returns the stable id for a currency/date pair.
    pub fn for_rate(currency: CurrencyCode, date: NaiveDate) -> Self {
        let key = format!("{}/{}", currency.code(), date.format("%Y-%m-%d"));
        Self(Uuid::new_v5(&CACHE_ENTRY_NAMESPACE, key.as_bytes()))
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for CacheEntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CacheEntryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// One side of a rate: an amount of a currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateLeg {
    pub currency: CurrencyCode,
    pub value: f64,
}

impl RateLeg {
    pub fn new(currency: CurrencyCode, value: f64) -> Self {
        Self { currency, value }
    }
}

/// A cached rate: `from` units of one currency are worth `to` units of another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRateCacheEntry {
    pub id: CacheEntryId,
    pub currency: CurrencyCode,
    pub from: RateLeg,
    pub to: RateLeg,
    pub date: NaiveDate,
    pub provider: ProviderType,
    pub is_latest: bool,
}

impl ExchangeRateCacheEntry {
    /// Converts a provider rate into a non-latest entry.
    ///
    /// # Validation
    /// - The rate itself must validate
    /// - The rate must carry details for `provider`, which name the quote currency
    pub fn from_rate(rate: &CurrencyRate, provider: ProviderType) -> Result<Self, DomainError> {
        rate.validate()?;

        let details = rate
            .details_for(provider)
            .ok_or(DomainError::MissingDetails {
                currency: rate.currency(),
                provider,
            })?;

        let base = details.base_currency();
        if !base.is_defined() {
            return Err(DomainError::UndefinedCurrency);
        }

        Ok(Self {
            id: CacheEntryId::for_rate(rate.currency(), rate.date()),
            currency: rate.currency(),
            from: RateLeg::new(rate.currency(), 1.0),
            to: RateLeg::new(base, rate.rate()),
            date: rate.date(),
            provider,
            is_latest: false,
        })
    }

    /// Rate expressed as `to` units per one `from` unit.
    pub fn rate(&self) -> f64 {
        self.to.value / self.from.value
    }

    pub fn as_latest(mut self) -> Self {
        self.is_latest = true;
        self
    }

    pub fn as_historical(mut self) -> Self {
        self.is_latest = false;
        self
    }
}
