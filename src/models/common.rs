use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::utils::retry::RetryConfig;

#[derive(Debug, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub address: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub chain_name: String,
    pub rpc_url: String,
    pub contract_address: Address,
    /// First block to ingest when the store holds no cursor yet.
    pub start_block: u64,
    /// Maximum number of blocks per fetched batch.
    pub batch_size: u64,
    /// Stay this many blocks behind the chain head to dodge shallow reorgs.
    pub chain_tip_buffer: u64,
    pub poll_interval_ms: u64,
    pub db_path: PathBuf,
    #[serde(default)]
    pub retry: RetryConfig,
    pub metrics: MetricsConfig,
}
