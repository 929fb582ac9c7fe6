//! Prices one article for one customer through the pricing chain.
//!
//! # Environment Variables
//!
//! - `DAISYCHAIN_CONFIG`: chain configuration file (default: bundled)
//! - `DAISYCHAIN_LOG_JSON`: emit JSON logs (`true`/`false`)
//! - `RUST_LOG`: log filter (default: `info`)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use daisychain_core::ChainInterface;
use daisychain_wiring::pricing::{
    wire_bundled, wire_from_config, Article, Customer, CustomerDirectory, Money, PriceCalculator,
};
use daisychain_wiring::ChainConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Daisychain pricing demo
#[derive(Parser, Debug)]
#[command(name = "daisychain-pricing")]
#[command(version, about, long_about = None)]
struct Args {
    /// Chain configuration file; the bundled configuration is used if omitted
    #[arg(short, long, env = "DAISYCHAIN_CONFIG")]
    config: Option<PathBuf>,

    /// Customer id (sample directory: c-100 employee, c-200 vouchers, c-300 both)
    #[arg(short = 'u', long, default_value = "c-100")]
    customer: String,

    /// Article list price in cents
    #[arg(short, long, default_value_t = 10_000)]
    price: i64,

    /// Article name
    #[arg(long, default_value = "Desk lamp")]
    article: String,

    /// Print the configured pipelines before pricing
    #[arg(long)]
    describe: bool,

    /// Emit logs as JSON
    #[arg(long, env = "DAISYCHAIN_LOG_JSON")]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let directory = Arc::new(CustomerDirectory::sample());
    let calculator = match &args.config {
        Some(path) => {
            let config = ChainConfig::from_path(path)?;
            info!(path = %path.display(), "loaded chain configuration");
            wire_from_config(&config, directory)?
        }
        None => wire_bundled(directory)?,
    };

    if args.describe {
        for pipeline in calculator.dispatcher().describe() {
            print!("{pipeline}");
        }
    }

    let article = Article {
        id: "article-1".to_string(),
        name: args.article,
        price: Money::from_cents(args.price),
    };
    let customer = Customer {
        id: args.customer.clone(),
        name: args.customer,
    };
    let price = calculator
        .calculate_price(article.clone(), customer.clone())?
        .context("pricing chain produced no price")?;

    println!("{} for {}: {} (list price {})", article.name, customer.id, price, article.price);
    Ok(())
}
