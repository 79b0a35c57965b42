//! # Rates Repository
//!
//! Concrete storage adapters for the exchange-rate engine. This crate provides
//! implementations of the `ExchangeRateCache` and `TrailRepository` ports:
//! - [`memory`] - `DashMap`-backed stores, always available
//! - [`sqlite`] - SQLite stores behind the `sqlite` feature
//!
//! # Examples
//!
//! ```ignore
//! // SQLite (with `sqlite` feature)
//! let pool = rates_repo::sqlite::connect("sqlite://rates.db?mode=rwc").await?;
//! let cache = SqliteRateCache::new(pool.clone());
//! let trails = SqliteTrailRepository::new(pool);
//! ```

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
mod types;


pub use memory::{InMemoryRateCache, InMemoryTrailRepository};
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteRateCache, SqliteTrailRepository};
