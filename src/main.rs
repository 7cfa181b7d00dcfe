use alloy_network::AnyNetwork;
use alloy_provider::ProviderBuilder;
use anyhow::{Context, Result, anyhow};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{self, EnvFilter};
use url::Url;

use ctf_exchange_indexer::indexer::{Pipeline, PipelineConfig};
use ctf_exchange_indexer::metrics::Metrics;
use ctf_exchange_indexer::source::RpcLogSource;
use ctf_exchange_indexer::storage::{EntityStore, SqliteStore};
use ctf_exchange_indexer::utils::load_config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    println!();
    info!("=========================== INITIALIZING ===========================");

    // Load config
    let config = match load_config("config.yml") {
        Ok(config) => {
            info!("Config loaded successfully");
            config
        }
        Err(e) => {
            error!("Failed to load config: {}", e);
            return Err(anyhow!(e));
        }
    };

    // Initialize optional metrics
    let metrics = if config.metrics.enabled {
        Some(Metrics::new(config.chain_name.clone())?)
    } else {
        info!("Metrics are disabled");
        None
    };

    // Start metrics server if metrics are enabled
    if let Some(metrics_instance) = &metrics {
        metrics_instance
            .start_metrics_server(&config.metrics.address, config.metrics.port)
            .await;
    }

    // Open the entity store and pick up where a previous run left off
    let store = SqliteStore::open(&config.db_path)
        .with_context(|| format!("failed to open entity store at {}", config.db_path.display()))?;
    match store.last_processed_block()? {
        Some(block) => info!("Resuming after committed block {}", block),
        None => info!("Starting from configured block {}", config.start_block),
    }

    // Create RPC provider and the log source over it
    let rpc_url: Url = config.rpc_url.parse()?;
    info!("RPC URL: {:?}", config.rpc_url);
    let provider = ProviderBuilder::new()
        .network::<AnyNetwork>()
        .connect_http(rpc_url);
    let source = RpcLogSource::new(provider, config.contract_address, metrics.clone());

    // Create a shutdown signal handler. The pipeline stops between batches.
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if let Ok(()) = signal::ctrl_c().await {
            info!("Received Ctrl+C signal, initiating shutdown...");
            let _ = shutdown_tx.send(());
        }
    });

    let pipeline_config = PipelineConfig {
        start_block: config.start_block,
        batch_size: config.batch_size,
        chain_tip_buffer: config.chain_tip_buffer,
        poll_interval_ms: config.poll_interval_ms,
    };

    println!();
    info!("========================= STARTING INDEXER =========================");

    let mut pipeline = Pipeline::new(
        source,
        store,
        pipeline_config,
        config.retry,
        metrics,
        shutdown_rx,
    );
    pipeline.run().await?;

    Ok(())
}
