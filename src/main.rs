// Channel Rate Limiter - Main Entry Point
//
// Command line front end for the rate limiter:
// - Queries against the configured genesis state
// - Genesis export
// - Replay of packet and governance event scripts
// - Daemon mode with epoch loop and HTTP endpoints

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

use channel_ratelimit::config::Config;
use channel_ratelimit::metrics;
use channel_ratelimit::metrics_server::start_metrics_server;
use channel_ratelimit::node::{Event, EventOutcome, Node, SharedNode};

/// Per-channel, per-denom transfer rate limiter
#[derive(Parser, Debug)]
#[command(name = "ratelimit")]
#[command(author = "Channel Ratelimit Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Per-channel, per-denom transfer quotas for inter-chain packet relay", long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (default: ~/.config/channel-ratelimit/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Query rate limits
    #[command(subcommand)]
    Query(QueryCommand),

    /// Print the genesis state as JSON
    Export,

    /// Apply a JSON array of events in order, printing one outcome per line
    Replay {
        /// Path to the events file
        events: PathBuf,

        /// Write the resulting genesis state to this file
        #[arg(long)]
        state_out: Option<PathBuf>,
    },

    /// Run the epoch loop and the HTTP endpoints
    Serve,
}

#[derive(Subcommand, Debug)]
enum QueryCommand {
    /// Rate limit for one channel and denom
    Get {
        channel_id: String,

        #[arg(long)]
        denom: String,
    },
    /// Every rate limit
    List,
    /// Rate limits on channels whose counterparty is the given chain
    #[command(alias = "list-by-chain")]
    ByChain { chain_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            anyhow::ensure!(path.exists(), "Config file not found: {:?}", path);
            Config::load_from_path(path)?
        }
        None => Config::load()?,
    };

    channel_ratelimit::logging::init(&config, args.verbose)?;

    match args.command {
        Some(Commands::Query(query)) => run_query(&config, query)?,
        Some(Commands::Export) => {
            let node = Node::from_config(&config)?;
            print_json(&node.export_genesis())?;
        }
        Some(Commands::Replay { events, state_out }) => {
            replay(&config, &events, state_out.as_deref())?;
        }
        Some(Commands::Serve) => serve(config).await?,
        None => {
            info!("No command specified. Use \"ratelimit --help\" for usage.");
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

fn run_query(config: &Config, query: QueryCommand) -> Result<()> {
    let node = Node::from_config(config)?;
    match query {
        QueryCommand::Get { channel_id, denom } => {
            let rate_limit = node
                .manager
                .get_rate_limit(&denom, &channel_id)
                .with_context(|| format!("No rate limit for {} on {}", denom, channel_id))?;
            print_json(&rate_limit)
        }
        QueryCommand::List => print_json(&node.manager.all_rate_limits()),
        QueryCommand::ByChain { chain_id } => {
            print_json(&node.manager.rate_limits_by_chain_id(&chain_id, &node.host))
        }
    }
}

fn replay(config: &Config, path: &Path, state_out: Option<&Path>) -> Result<()> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read events file {:?}", path))?;
    let events: Vec<Event> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse events file {:?}", path))?;

    let mut node = Node::from_config(config)?;
    info!(events = events.len(), "Replaying events");

    for event in &events {
        let outcome = node.apply(event);
        println!("{}", serde_json::to_string(&outcome)?);
    }

    if let Some(out) = state_out {
        let genesis = serde_json::to_string_pretty(&node.export_genesis())?;
        fs::write(out, genesis).with_context(|| format!("Failed to write state to {:?}", out))?;
    }
    Ok(())
}

async fn serve(config: Config) -> Result<()> {
    metrics::init().context("Failed to initialize metrics")?;

    let node: SharedNode = Node::from_config(&config)?.into_shared();
    metrics::RATE_LIMITS_ACTIVE.set(node.read().await.manager.store().len() as i64);

    if config.metrics.enabled {
        let server_node = node.clone();
        let port = config.metrics.port;
        tokio::spawn(async move {
            if let Err(e) = start_metrics_server(port, server_node).await {
                error!("Metrics server stopped: {:#}", e);
            }
        });
    }

    info!(
        authority = %config.rate_limit.authority,
        epoch_secs = config.rate_limit.epoch_duration_secs,
        "Rate limiter running"
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(config.metrics.tick_interval_secs));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let outcome = node.write().await.begin_block(Utc::now());
                if let EventOutcome::EpochProcessed { report } = outcome {
                    info!(
                        epoch = report.epoch_number,
                        reset = report.reset.len(),
                        failed = report.failed.len(),
                        "Hour epoch started"
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}
