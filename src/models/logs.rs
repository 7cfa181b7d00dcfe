use alloy_primitives::{Address, B256, Bytes};
use chrono::{DateTime, Utc};

/// One raw log entry as delivered by a log source.
///
/// `(tx_hash, log_index)` uniquely identifies the log within the chain, which
/// is what makes reprocessing idempotent downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLogEvent {
    pub contract_address: Address,
    /// Event signature hash followed by the indexed parameters.
    pub topics: Vec<B256>,
    /// ABI-encoded non-indexed parameters.
    pub data: Bytes,
    pub block_number: u64,
    pub block_time: DateTime<Utc>,
    pub tx_hash: B256,
    pub log_index: u64,
}
