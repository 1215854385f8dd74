use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use promsql::batch::{translate_batch, TranslationRequest};
use promsql::config::ConverterConfig;
use promsql::converter::functions::FunctionRegistry;
use promsql::converter::Converter;
use promsql::metrics;

/// Translate PromQL expression trees to ClickHouse SQL.
#[derive(Parser, Debug)]
#[command(name = "promsql")]
#[command(about = "Translate PromQL expression trees to ClickHouse SQL")]
struct Args {
    /// Converter configuration (JSON); defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON array of `{tree, evaluation}` requests
    #[arg(short, long)]
    input: PathBuf,

    /// Serve Prometheus metrics on this address while running
    #[arg(long)]
    metrics_addr: Option<SocketAddr>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: Level,

    /// Print outcomes as JSON instead of plain SQL
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout only carries SQL
    FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    if let Some(addr) = args.metrics_addr {
        match metrics::init_metrics(addr) {
            Ok(()) => info!("Metrics server listening on {}", addr),
            Err(e) => warn!("Failed to initialize metrics: {}", e),
        }
    }

    let registry = FunctionRegistry::try_builtin().context("invalid built-in function table")?;
    info!("Loaded {} PromQL functions", registry.len());

    let config = match &args.config {
        Some(path) => ConverterConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ConverterConfig::default(),
    };

    let contents = std::fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let requests: Vec<TranslationRequest> =
        serde_json::from_str(&contents).context("failed to parse translation requests")?;
    info!("Translating {} queries", requests.len());

    let converter = Arc::new(Converter::new(config));
    let outcomes = translate_batch(converter, requests).await?;

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    } else {
        for (index, outcome) in outcomes.iter().enumerate() {
            match (&outcome.sql, &outcome.error) {
                (Some(sql), _) => println!("{};", sql),
                (None, Some(error)) => warn!(request = index, "{}", error),
                (None, None) => {}
            }
        }
    }

    info!("Done: {} translated, {} failed", outcomes.len() - failed, failed);
    Ok(())
}
