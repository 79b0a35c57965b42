//! Currency catalog.
//!
//! Currencies are declared once in the `define_currencies!` invocation below; the
//! macro generates the `CurrencyCode` enum, its metadata accessors and the
//! string conversions. Unknown codes never fail to parse: they resolve to
//! `CurrencyCode::Undefined`.
//!
//! # Adding a New Currency
//! ```ignore
//! define_currencies! {
//!     // ... existing currencies ...
//!     AUD => ("AUD", "A$", 0.66),
//! }
//! ```

use std::fmt;

macro_rules! define_currencies {
    (
        $(
            $name:ident => ($code:literal, $symbol:literal, $to_usd:expr)
        ),* $(,)?
    ) => {
        /// ISO-4217 currency codes known to the engine.
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum CurrencyCode {
            $($name,)*
            /// Sentinel for any code outside the catalog.
            #[default]
            Undefined,
        }

        impl CurrencyCode {
            pub fn code(&self) -> &'static str {
                match self {
                    $(CurrencyCode::$name => $code,)*
                    CurrencyCode::Undefined => "UNDEFINED",
                }
            }

            pub fn symbol(&self) -> &'static str {
                match self {
                    $(CurrencyCode::$name => $symbol,)*
                    CurrencyCode::Undefined => "?",
                }
            }

            /// Reference value of one unit in USD, used by the fixed provider.
            pub fn reference_usd_rate(&self) -> f64 {
                match self {
                    $(CurrencyCode::$name => $to_usd,)*
                    CurrencyCode::Undefined => 0.0,
                }
            }

            /// Every defined currency (the sentinel is excluded).
            pub fn all() -> &'static [CurrencyCode] {
                &[$(CurrencyCode::$name),*]
            }

            /// Resolves a code case-insensitively, falling back to `Undefined`.
            pub fn from_code(code: &str) -> Self {
                match code.trim().to_uppercase().as_str() {
                    $($code => CurrencyCode::$name,)*
                    _ => CurrencyCode::Undefined,
                }
            }
        }
    };
}

define_currencies! {
    USD => ("USD", "$", 1.0),
    EUR => ("EUR", "€", 1.087),
    GBP => ("GBP", "£", 1.266),
    INR => ("INR", "₹", 0.01203),
    CHF => ("CHF", "Fr", 1.128),
    JPY => ("JPY", "¥", 0.0067),
    PLN => ("PLN", "zł", 0.251),
    CZK => ("CZK", "Kč", 0.0438),
    SEK => ("SEK", "kr", 0.0957),
    NOK => ("NOK", "kr", 0.0941),
}

impl CurrencyCode {
    pub fn is_defined(&self) -> bool {
        *self != CurrencyCode::Undefined
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(CurrencyCode::from_code(s))
    }
}

impl From<String> for CurrencyCode {
    fn from(code: String) -> Self {
        CurrencyCode::from_code(&code)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.code().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_code_parse() {
        assert_eq!("USD".parse::<CurrencyCode>().unwrap(), CurrencyCode::USD);
        assert_eq!("eur".parse::<CurrencyCode>().unwrap(), CurrencyCode::EUR);
    }

    #[test]
    fn test_unknown_code_falls_back_to_undefined() {
        assert_eq!(CurrencyCode::from_code("XYZ"), CurrencyCode::Undefined);
        assert_eq!(CurrencyCode::from_code(""), CurrencyCode::Undefined);
        assert!(!CurrencyCode::Undefined.is_defined());
    }

    #[test]
    fn test_serde_uses_codes() {
        let json = serde_json::to_string(&CurrencyCode::PLN).unwrap();
        assert_eq!(json, "\"PLN\"");

        let parsed: CurrencyCode = serde_json::from_str("\"chf\"").unwrap();
        assert_eq!(parsed, CurrencyCode::CHF);

        let unknown: CurrencyCode = serde_json::from_str("\"BTC\"").unwrap();
        assert_eq!(unknown, CurrencyCode::Undefined);
    }

    #[test]
    fn test_all_excludes_sentinel() {
        assert_eq!(CurrencyCode::all().len(), 10);
        assert!(!CurrencyCode::all().contains(&CurrencyCode::Undefined));
    }
}
