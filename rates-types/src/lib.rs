//! # Rates Types
//!
//! Domain types and port traits for the exchange-rate acquisition, caching and
//! audit-trail engine. This crate has ZERO external IO dependencies - only data
//! structures, business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (CurrencyRate, ExchangeRateCacheEntry, TrailRecord)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Domain and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    CacheEntryId, CurrencyCode, CurrencyRate, ExchangeRateCacheEntry, FailureKind, FixedDetails,
    NbpDetails, ProviderDetails, ProviderType, RateLeg, SyncReport, TrailFailure, TrailId,
    TrailOperation, TrailRecord, TrailState,
};
pub use dto::*;
pub use error::{AppError, ConfigError, DomainError, RepoError};
pub use ports::{CurrencyRateProvider, ExchangeRateCache, ProviderError, TrailRepository};
