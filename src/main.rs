//! Book Arbitrage Analytics Backend
//!
//! REST service plus operator CLI for one-off and bulk analysis runs.

use std::sync::Arc;
use std::time::Instant;

use bookflip::{
    analyzer::{run_batch, Analyzer},
    client::{HttpProductClient, ProductSource},
    config::Config,
    scoring::profitability,
    server::{serve, AppState},
    storage::Database,
    types::AnalysisRecord,
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "bookflip")]
#[command(about = "Book arbitrage analytics backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the REST API server
    Serve,
    /// Analyze a single ASIN and print the record
    Analyze {
        asin: String,
        /// Known acquisition cost in dollars (otherwise estimated)
        #[arg(long)]
        cost: Option<Decimal>,
    },
    /// Analyze a file of ASINs (one per line)
    Batch {
        file: String,
        /// Concurrent analyses
        #[arg(long, default_value = "4")]
        concurrency: usize,
    },
    /// Run the profitability calculator standalone
    Profit {
        #[arg(long)]
        price: Decimal,
        #[arg(long)]
        cost: Decimal,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        weight_kg: Option<Decimal>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Serve => run_server(config).await,
        Commands::Analyze { asin, cost } => analyze_one(config, &asin, cost).await,
        Commands::Batch { file, concurrency } => batch(config, &file, concurrency).await,
        Commands::Profit {
            price,
            cost,
            category,
            weight_kg,
        } => {
            let fees = config.fees.for_category(category.as_deref());
            let result = profitability(price, cost, weight_kg, fees);
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    }
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    tracing::info!("starting analytics server");

    let source = Arc::new(HttpProductClient::new(&config.provider)?);
    let db = Database::connect(&config.database.path).await?;
    let state = Arc::new(AppState {
        analyzer: Analyzer::new(config.analytics.clone(), config.fees.clone()),
        source,
        db,
        fees: config.fees,
        started_at: Instant::now(),
    });

    serve(state, &config.server.bind).await?;
    Ok(())
}

async fn analyze_one(config: Config, asin: &str, cost: Option<Decimal>) -> anyhow::Result<()> {
    let client = HttpProductClient::new(&config.provider)?;
    let analyzer = Analyzer::new(config.analytics, config.fees);

    let raw = client.fetch_product(asin).await?;
    let record = analyzer.analyze(&raw, cost, Utc::now())?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    print_summary(&record);
    Ok(())
}

async fn batch(config: Config, file: &str, concurrency: usize) -> anyhow::Result<()> {
    let asins: Vec<String> = std::fs::read_to_string(file)?
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect();

    let source = Arc::new(HttpProductClient::new(&config.provider)?);
    let analyzer = Arc::new(Analyzer::new(config.analytics, config.fees));
    let db = Database::connect(&config.database.path).await?;

    let outcomes = run_batch(source, analyzer, asins, concurrency).await;

    let mut failed = 0usize;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(record) => {
                db.save(record).await?;
                println!(
                    "{}  risk={} ({})  velocity={}  profit_tier={}",
                    record.asin,
                    record.risk.score,
                    record.risk.tier,
                    record.velocity.score,
                    record
                        .profitability
                        .as_ref()
                        .map(|p| p.tier.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                );
            }
            Err(e) => {
                failed += 1;
                eprintln!("{}  FAILED: {}", outcome.asin, e);
            }
        }
    }
    println!("{} analyzed, {} failed", outcomes.len() - failed, failed);
    Ok(())
}

fn print_summary(record: &AnalysisRecord) {
    eprintln!(
        "{}: risk {} ({}), velocity {} ({}), stability {} ({}), confidence {} ({})",
        record.asin,
        record.risk.score,
        record.risk.tier,
        record.velocity.score,
        record.velocity.tier,
        record.stability.score,
        record.stability.tier,
        record.data_confidence.score,
        record.data_confidence.tier,
    );
    for flag in &record.flags {
        eprintln!("  note: {flag}");
    }
}
