//! Domain models for the exchange-rate engine.

pub mod cache_entry;
pub mod currency;
pub mod provider;
pub mod rate;
pub mod trail;

pub use cache_entry::{CacheEntryId, ExchangeRateCacheEntry, RateLeg};
pub use currency::CurrencyCode;
pub use provider::{FixedDetails, NbpDetails, ProviderDetails, ProviderType};
pub use rate::CurrencyRate;
pub use trail::{
    FailureKind, SyncReport, TrailFailure, TrailId, TrailOperation, TrailRecord, TrailState,
};
