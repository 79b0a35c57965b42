//! Provider catalog and provider-specific rate details.

use serde::{Deserialize, Serialize};

use super::currency::CurrencyCode;

/// Kinds of rate providers the engine knows how to talk to.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProviderType {
    /// In-process reference table.
    Fixed,
    /// National Bank of Poland, table A.
    Nbp,
    #[default]
    Undefined,
}

impl ProviderType {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderType::Fixed => "FIXED",
            ProviderType::Nbp => "NBP",
            ProviderType::Undefined => "UNDEFINED",
        }
    }

    /// Resolves a provider name case-insensitively, falling back to `Undefined`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_uppercase().as_str() {
            "FIXED" => ProviderType::Fixed,
            "NBP" => ProviderType::Nbp,
            _ => ProviderType::Undefined,
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<String> for ProviderType {
    fn from(name: String) -> Self {
        ProviderType::from_name(&name)
    }
}

impl From<ProviderType> for String {
    fn from(provider: ProviderType) -> Self {
        provider.name().to_string()
    }
}

/// Details attached by the fixed provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedDetails {
    /// Currency the fixed table is quoted against.
    pub base: CurrencyCode,
}

/// Details attached by the NBP provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NbpDetails {
    /// Table letter (A, B or C).
    pub table: String,
    /// Publication number, e.g. `007/A/NBP/2024`.
    pub number: String,
}

/// Provider-specific payload carried alongside a rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "UPPERCASE")]
pub enum ProviderDetails {
    Fixed(FixedDetails),
    Nbp(NbpDetails),
}

impl ProviderDetails {
    pub fn provider_type(&self) -> ProviderType {
        match self {
            ProviderDetails::Fixed(_) => ProviderType::Fixed,
            ProviderDetails::Nbp(_) => ProviderType::Nbp,
        }
    }

    /// The currency this provider quotes rates against.
    pub fn base_currency(&self) -> CurrencyCode {
        match self {
            ProviderDetails::Fixed(details) => details.base,
            ProviderDetails::Nbp(_) => CurrencyCode::PLN,
        }
    }
}
