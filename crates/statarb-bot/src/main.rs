//! Statistical arbitrage pairs monitor - Entry Point
//!
//! `ingest`: stream trades into the tick store and watch the configured pair.
//! `analyze`: evaluate a pair against stored ticks and print the report.

use anyhow::Result;
use clap::{Parser, Subcommand};
use statarb_bot::{AppConfig, Application};
use statarb_core::Symbol;
use tracing::info;

/// Statistical arbitrage pairs monitor
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via STATARB_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest the live trade feed until ctrl-c
    Ingest,
    /// Evaluate a pair against stored ticks and print the report as JSON
    Analyze {
        /// First leg (defaults to analytics.symbol_a)
        #[arg(long)]
        a: Option<String>,
        /// Second leg (defaults to analytics.symbol_b)
        #[arg(long)]
        b: Option<String>,
        /// Rolling window length
        #[arg(long)]
        window: Option<usize>,
        /// Alert threshold on |z|
        #[arg(long)]
        z: Option<f64>,
        /// Most recent ticks loaded per leg
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    statarb_telemetry::init_logging("info,statarb=debug")?;

    info!("Starting statarb v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load(args.config.as_deref())?;
    let app = Application::new(config)?;

    match args.command {
        Command::Ingest => {
            let stats = app.run().await?;
            info!(appended = stats.appended, dropped = stats.dropped, "Shutdown complete");
        }
        Command::Analyze {
            a,
            b,
            window,
            z,
            limit,
        } => {
            let mut query = app.config().pair_query()?;
            if let Some(a) = a {
                query.symbol_a = Symbol::new(&a)?;
            }
            if let Some(b) = b {
                query.symbol_b = Symbol::new(&b)?;
            }
            if let Some(window) = window {
                query.window = window;
            }
            if let Some(z) = z {
                query.z_threshold = z;
            }
            if let Some(limit) = limit {
                query.limit = limit;
            }

            let report = app.analyze(query).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
