//! Rates CLI
//!
//! Command-line interface for the exchange-rate management API.

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use rates_client::RatesClient;
use rates_types::{
    CurrencyCode, CurrencyRate, FixedDetails, NbpDetails, ProviderDetails, TrailId,
    TrailOperation, TrailQuery, TrailState,
};

#[derive(Parser)]
#[command(name = "rates")]
#[command(author, version, about = "Exchange-rate API CLI client", long_about = None)]
struct Cli {
    /// Base URL of the exchange-rate API
    #[arg(long, env = "RATES_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Exchange-rate operations
    Rates {
        #[command(subcommand)]
        action: RateCommands,
    },
    /// Audit trail lookups
    Trail {
        #[command(subcommand)]
        action: TrailCommands,
    },
    /// Check API health
    Health,
}

#[derive(Subcommand)]
enum RateCommands {
    /// Start a latest-rate refresh
    Refresh,
    /// Start a historical update
    History,
    /// Show latest rates
    Latest {
        /// Currencies to show (comma-separated); all when omitted
        #[arg(long, value_delimiter = ',')]
        currencies: Vec<String>,
    },
    /// Show the latest rate for one currency
    Get {
        /// Currency code, e.g. EUR
        currency: String,
    },
    /// Create or update a single rate
    Set {
        #[arg(long)]
        currency: String,
        /// Rate date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
        #[arg(long)]
        rate: f64,
        /// Quoting provider (FIXED or NBP)
        #[arg(long, default_value = "FIXED")]
        provider: String,
        /// NBP table number, e.g. 007/A/NBP/2024
        #[arg(long)]
        number: Option<String>,
    },
    /// Delete every cached rate
    Purge,
}

#[derive(Subcommand)]
enum TrailCommands {
    /// List trail records, newest first
    List {
        /// Day the run happened (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        /// HISTORICAL_UPDATE, LATEST_SYNCHRONIZATION or CREATE_OR_UPDATE
        #[arg(long)]
        operation: Option<String>,
        /// SUCCESS or ERROR
        #[arg(long)]
        state: Option<String>,
        #[arg(long, default_value = "0")]
        page: u32,
        #[arg(long, default_value = "20")]
        size: u32,
    },
    /// Get one trail record
    Get {
        /// Trail ID (UUID)
        id: String,
    },
}

fn parse_currency(s: &str) -> Result<CurrencyCode> {
    match CurrencyCode::from_code(s) {
        CurrencyCode::Undefined => anyhow::bail!("Unknown currency: {}", s),
        currency => Ok(currency),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("Invalid date: {} (expected YYYY-MM-DD)", s))
}

fn parse_trail_id(s: &str) -> Result<TrailId> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("Invalid trail ID: {}", s))
}

fn build_rate(
    currency: &str,
    date: &str,
    rate: f64,
    provider: &str,
    number: Option<String>,
) -> Result<CurrencyRate> {
    let details = match provider.to_uppercase().as_str() {
        "FIXED" => ProviderDetails::Fixed(FixedDetails {
            base: CurrencyCode::USD,
        }),
        "NBP" => ProviderDetails::Nbp(NbpDetails {
            table: "A".to_string(),
            number: number.unwrap_or_default(),
        }),
        _ => anyhow::bail!("Unknown provider: {}. Supported: FIXED, NBP", provider),
    };
    Ok(CurrencyRate::new(parse_currency(currency)?, parse_date(date)?, rate).with_details(details))
}

fn build_trail_query(
    date: Option<String>,
    operation: Option<String>,
    state: Option<String>,
    page: u32,
    size: u32,
) -> Result<TrailQuery> {
    Ok(TrailQuery {
        date: date.as_deref().map(parse_date).transpose()?,
        operation: operation
            .as_deref()
            .map(str::parse::<TrailOperation>)
            .transpose()
            .map_err(anyhow::Error::msg)?,
        state: state
            .as_deref()
            .map(str::parse::<TrailState>)
            .transpose()
            .map_err(anyhow::Error::msg)?,
        page: Some(page),
        size: Some(size),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let client = RatesClient::new(&cli.api_url);

    match cli.command {
        Commands::Health => {
            let healthy = client.health().await?;
            if healthy {
                println!("✓ API is healthy");
            } else {
                println!("✗ API is not healthy");
                std::process::exit(1);
            }
        }

        Commands::Rates { action } => match action {
            RateCommands::Refresh => {
                client.refresh().await?;
                println!("✓ Refresh started");
            }
            RateCommands::History => {
                client.history_update().await?;
                println!("✓ Historical update started");
            }
            RateCommands::Latest { currencies } => {
                let currencies = currencies
                    .iter()
                    .filter(|c| !c.is_empty())
                    .map(|c| parse_currency(c))
                    .collect::<Result<Vec<_>>>()?;
                let entries = client.latest(&currencies).await?;
                println!("{}", serde_json::to_string_pretty(&entries)?);
            }
            RateCommands::Get { currency } => {
                let entry = client.latest_for(parse_currency(&currency)?).await?;
                println!("{}", serde_json::to_string_pretty(&entry)?);
            }
            RateCommands::Set {
                currency,
                date,
                rate,
                provider,
                number,
            } => {
                let rate = build_rate(&currency, &date, rate, &provider, number)?;
                let entry = client.create_or_update(&rate).await?;
                println!("{}", serde_json::to_string_pretty(&entry)?);
            }
            RateCommands::Purge => {
                let deleted = client.purge().await?;
                println!("✓ {} cached rate(s) deleted", deleted);
            }
        },

        Commands::Trail { action } => match action {
            TrailCommands::List {
                date,
                operation,
                state,
                page,
                size,
            } => {
                let query = build_trail_query(date, operation, state, page, size)?;
                let records = client.trails(&query).await?;
                println!("{}", serde_json::to_string_pretty(&records)?);
            }
            TrailCommands::Get { id } => {
                let record = client.trail(parse_trail_id(&id)?).await?;
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rates_types::ProviderType;

    #[test]
    fn test_cli_parses_rate_set() {
        let cli = Cli::try_parse_from([
            "rates", "rates", "set", "--currency", "eur", "--date", "2024-01-10", "--rate", "1.09",
        ])
        .unwrap();
        let Commands::Rates {
            action: RateCommands::Set { provider, .. },
        } = cli.command
        else {
            panic!("expected rates set");
        };
        assert_eq!(provider, "FIXED");
    }

    #[test]
    fn test_build_rate() {
        let rate = build_rate("eur", "2024-01-10", 1.09, "nbp", Some("007/A/NBP/2024".into()))
            .unwrap();
        assert_eq!(rate.currency(), CurrencyCode::EUR);
        assert!(rate.details_for(ProviderType::Nbp).is_some());

        assert!(build_rate("XYZ", "2024-01-10", 1.0, "fixed", None).is_err());
        assert!(build_rate("EUR", "10/01/2024", 1.0, "fixed", None).is_err());
        assert!(build_rate("EUR", "2024-01-10", 1.0, "ecb", None).is_err());
    }

    #[test]
    fn test_build_trail_query() {
        let query = build_trail_query(
            Some("2024-01-10".into()),
            Some("latest_synchronization".into()),
            None,
            1,
            50,
        )
        .unwrap();
        assert_eq!(query.operation, Some(TrailOperation::LatestSynchronization));
        assert_eq!(query.page_request().offset(), 50);

        assert!(build_trail_query(None, None, Some("DONE".into()), 0, 20).is_err());
    }
}
