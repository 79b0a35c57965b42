//! # Rates Providers
//!
//! Adapters implementing the `CurrencyRateProvider` port:
//! - [`FixedRateProvider`] - in-process reference table for development and testing
//! - [`NbpProvider`] - National Bank of Poland table A over HTTP
//!
//! # Example
//! ```
//! use rates_providers::FixedRateProvider;
//! use rates_types::{CurrencyCode, CurrencyRateProvider};
//!
//! let provider = FixedRateProvider::new("fixed", CurrencyCode::USD);
//! assert_eq!(provider.name(), "fixed");
//! ```

pub mod fixed;
pub mod nbp;

pub use fixed::FixedRateProvider;
pub use nbp::NbpProvider;
