use anyhow::Result;
use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use fhir_gateway::cache::resource_cache;
use fhir_gateway::config::loader::load_config;
use fhir_gateway::observability::metrics::Metrics;
use fhir_gateway::server::server::{self, AppState};
use fhir_gateway::utils::logging::{self, LogLevel};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "fhir-gateway.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // -------------------------------
    // 1. Load YAML config + logging
    // -------------------------------

    let config = load_config(&args.config)?;
    logging::run(&config, args.log_level)?;

    // -------------------------------
    // 2. Build shared state (key material, token manager, cache, forwarder)
    // -------------------------------

    let metrics = Metrics::new();
    let state = AppState::build(&config, metrics)?;
    info!("forwarding to upstream {}", config.upstream.fhir_url);

    // -------------------------------
    // 3. Start the cache sweeper
    // -------------------------------

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let sweeper = resource_cache::spawn_sweeper(state.cache.clone(), &config.cache, shutdown_rx);

    // -------------------------------
    // 4. Serve until ctrl-c
    // -------------------------------

    server::start(&config, state, shutdown_tx).await?;

    sweeper.await?;
    info!("gateway stopped");
    Ok(())
}
