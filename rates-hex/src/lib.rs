//! # Rates Hex
//!
//! Application services and HTTP adapter for the exchange-rate engine.
//!
//! ## Architecture
//!
//! - `registry` - provider lookup, default resolution and broadcast
//! - `latest` - latest-rate reads, refresh and manual upserts
//! - `history` - historical back-fill
//! - `trail` - audit records and filtered lookups
//! - `scheduler` - periodic runs
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! The services are generic over `C: ExchangeRateCache` and
//! `T: TrailRepository`, allowing different storage adapters to be injected.

pub mod events;
mod failure;
pub mod history;
pub mod inbound;
pub mod latest;
pub mod reconcile;
pub mod registry;
pub mod scheduler;
pub mod settings;
pub mod trail;


pub use events::{EventPublisher, LatestRatesUpdated};
pub use history::HistoricalSyncService;
pub use latest::LatestRateService;
pub use reconcile::{Reconciled, Reconciler};
pub use registry::ProviderRegistry;
pub use scheduler::SyncScheduler;
pub use settings::RatesSettings;
pub use trail::{TrailPredicate, TrailService};
