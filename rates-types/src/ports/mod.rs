//! Port traits (interfaces for adapters).
//!
//! These are the contracts that adapters must implement.
//! The application layer depends on these traits, not concrete implementations.

mod cache;
mod provider;
mod trail;

pub use cache::ExchangeRateCache;
pub use provider::{CurrencyRateProvider, ProviderError};
pub use trail::TrailRepository;
