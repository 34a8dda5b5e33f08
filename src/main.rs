//! SOR Engine - Main Entry Point
//!
//! Loads venues and seed depth snapshots from configuration and answers
//! routing, scoring and impact queries against them, printing JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use sor_engine::config::load_config;
use sor_engine::{
    InMemoryMarketData, MarketDepth, RoutingRequest, RoutingStrategy, Side, SmartOrderRouter,
};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "sor.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a routing plan for a parent order
    Plan {
        symbol: String,
        /// buy or sell
        side: Side,
        quantity: u64,

        /// BEST_PRICE, VWAP, TWAP, MIN_IMPACT, POV, IMPLEMENTATION_SHORTFALL, DARK_POOL
        #[arg(short, long, default_value = "BEST_PRICE")]
        strategy: RoutingStrategy,

        /// Depth aggregation budget in milliseconds
        #[arg(long, default_value_t = 500)]
        time_limit_ms: u64,

        /// Maximum number of venues to consider (0 = no limit)
        #[arg(long, default_value_t = 0)]
        max_venues: usize,

        #[arg(long, default_value = "0")]
        min_fill_rate: Decimal,

        #[arg(long, default_value = "0")]
        max_slippage: Decimal,

        #[arg(long)]
        allow_dark_pool: bool,

        /// Comma-separated venue ids to restrict routing to
        #[arg(long)]
        venues: Option<String>,
    },
    /// Liquidity score of one venue for a symbol
    Score { venue: String, symbol: String },
    /// Market impact of a quantity across active lit venues
    Impact {
        symbol: String,
        side: Side,
        quantity: u64,
    },
    /// List configured venues
    Venues,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    info!("Configuration file: {}", args.config);
    let config = load_config(Some(&args.config)).context("failed to load configuration")?;
    if config.venues.is_empty() {
        warn!("No venues configured; every plan will be empty");
    }

    let gateway = InMemoryMarketData::from_snapshots(
        config.market_data.iter().cloned().map(MarketDepth::from),
    );
    info!(
        "Loaded {} venues and {} depth snapshots",
        config.venues.len(),
        gateway.len()
    );
    let router = SmartOrderRouter::from_config(&config, Arc::new(gateway));

    let output = match args.command {
        Command::Plan {
            symbol,
            side,
            quantity,
            strategy,
            time_limit_ms,
            max_venues,
            min_fill_rate,
            max_slippage,
            allow_dark_pool,
            venues,
        } => {
            let venue_filter = venues
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default();

            let request = RoutingRequest::new(symbol, side, quantity)
                .with_strategy(strategy)
                .with_time_limit(std::time::Duration::from_millis(time_limit_ms))
                .with_max_venues(max_venues)
                .with_min_fill_rate(min_fill_rate)
                .with_max_slippage(max_slippage)
                .allow_dark_pool(allow_dark_pool)
                .with_venue_filter(venue_filter);

            let result = router.create_routing_plan(request).await?;
            for warning in &result.warnings {
                warn!("{}", warning);
            }
            serde_json::to_string_pretty(&result)?
        }
        Command::Score { venue, symbol } => {
            let score = router.calculate_liquidity_score(&venue, &symbol).await?;
            serde_json::to_string_pretty(&score)?
        }
        Command::Impact {
            symbol,
            side,
            quantity,
        } => {
            let estimate = router.estimate_market_impact(&symbol, side, quantity).await?;
            serde_json::to_string_pretty(&estimate)?
        }
        Command::Venues => serde_json::to_string_pretty(&router.registry().all())?,
    };

    println!("{}", output);
    Ok(())
}
