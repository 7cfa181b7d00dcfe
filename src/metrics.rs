use std::sync::Arc;
use tracing::info;

use axum::{Router, routing::get};
use opentelemetry::metrics::{Counter, Gauge, Histogram, MeterProvider};
use opentelemetry_sdk::metrics::{MetricError, SdkMeterProvider};
use prometheus::{Encoder, TextEncoder};
use std::net::SocketAddr;

#[derive(Clone)]
pub struct Metrics {
    registry: Arc<prometheus::Registry>,
    _provider: SdkMeterProvider,
    pub chain_name: String,

    // Ingestion metrics
    pub logs_fetched: Counter<u64>,
    pub entities_committed: Counter<u64>,
    pub batches_committed: Counter<u64>,
    pub unknown_signature_logs: Counter<u64>,
    pub malformed_logs: Counter<u64>,
    pub reorg_rollbacks: Counter<u64>,
    pub last_committed_block: Gauge<u64>,
    pub batch_processing_time: Gauge<f64>,

    // Chain metrics
    pub chain_head_block: Gauge<u64>,
    pub chain_head_lag: Gauge<u64>,

    // RPC metrics
    pub rpc_requests: Counter<u64>,
    pub rpc_errors: Counter<u64>,
    pub rpc_latency: Histogram<f64>,
}

impl Metrics {
    pub fn new(chain_name: String) -> Result<Self, MetricError> {
        // Create a new prometheus registry
        let registry = prometheus::Registry::new();

        // Configure OpenTelemetry to use this registry
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()?;

        // Set up a meter to create instruments
        let provider = SdkMeterProvider::builder().with_reader(exporter).build();
        let meter = provider.meter("indexer_metrics");

        let logs_fetched = meter
            .u64_counter("indexer_logs_fetched")
            .with_description("Total number of raw logs fetched from the source")
            .build();

        let entities_committed = meter
            .u64_counter("indexer_entities_committed")
            .with_description("Total number of entities upserted to the store")
            .build();

        let batches_committed = meter
            .u64_counter("indexer_batches_committed")
            .with_description("Total number of block batches committed")
            .build();

        let unknown_signature_logs = meter
            .u64_counter("indexer_unknown_signature_logs")
            .with_description("Logs skipped because topic0 matched no known event")
            .build();

        let malformed_logs = meter
            .u64_counter("indexer_malformed_logs")
            .with_description("Logs skipped because the payload did not fit the matched ABI")
            .build();

        let reorg_rollbacks = meter
            .u64_counter("indexer_reorg_rollbacks")
            .with_description("Cursor rollbacks triggered by source reorg signals")
            .build();

        let last_committed_block = meter
            .u64_gauge("indexer_last_committed_block_number")
            .with_description("Highest block number fully committed to the store")
            .build();

        let batch_processing_time = meter
            .f64_gauge("indexer_batch_processing_time")
            .with_description("Time spent processing the latest batch")
            .build();

        let chain_head_block = meter
            .u64_gauge("indexer_chain_head_block_number")
            .with_description("Latest block number on chain")
            .build();

        let chain_head_lag = meter
            .u64_gauge("indexer_chain_head_lag")
            .with_description("Number of blocks behind chain head")
            .build();

        let rpc_requests = meter
            .u64_counter("indexer_rpc_requests")
            .with_description("Number of RPC requests made")
            .build();

        let rpc_errors = meter
            .u64_counter("indexer_rpc_errors")
            .with_description("Number of RPC errors encountered")
            .build();

        let rpc_latency = meter
            .f64_histogram("indexer_rpc_latency")
            .with_description("RPC request latency")
            .with_boundaries(vec![
                0.025, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 1.0, 5.0, 10.0,
            ])
            .with_unit("s")
            .build();

        Ok(Self {
            registry: Arc::new(registry),
            _provider: provider,
            chain_name,
            logs_fetched,
            entities_committed,
            batches_committed,
            unknown_signature_logs,
            malformed_logs,
            reorg_rollbacks,
            last_committed_block,
            batch_processing_time,
            chain_head_block,
            chain_head_lag,
            rpc_requests,
            rpc_errors,
            rpc_latency,
        })
    }

    pub async fn start_metrics_server(&self, addr: &str, port: u16) {
        let addr = format!("{addr}:{port}").parse::<SocketAddr>().unwrap();
        let registry = self.registry.clone();

        let app = Router::new().route("/metrics", get(move || metrics_handler(registry.clone())));

        // Determine the access URL based on the binding address. Only used for logging.
        let access_url = if addr.ip().to_string() == "0.0.0.0" {
            format!("http://localhost:{port}/metrics")
        } else {
            format!("http://{}:{port}/metrics", addr.ip())
        };

        info!(
            "Starting metrics server - binding to {} (accessible at {})",
            addr, access_url
        );

        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

        // Spawn the server in a separate task
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
    }
}

async fn metrics_handler(registry: Arc<prometheus::Registry>) -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}
