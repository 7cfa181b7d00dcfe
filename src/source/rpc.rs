use std::collections::HashMap;
use std::time::Instant;

use alloy_network::AnyNetwork;
use alloy_primitives::Address;
use alloy_provider::Provider;
use alloy_rpc_types_eth::Filter;
use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;

use crate::metrics::Metrics;
use crate::models::errors::FetchError;
use crate::models::logs::RawLogEvent;
use crate::source::{FetchOutcome, LogSource};

/// [`LogSource`] over a JSON-RPC provider.
///
/// Uses `eth_getLogs` filtered by the tracked contract, plus one header fetch
/// per block that carried a log to resolve timestamps. Plain JSON-RPC has no
/// undo stream, so this source never yields [`FetchOutcome::Reorg`]; staying
/// behind the tip buffer is the reorg defence for this provider class.
pub struct RpcLogSource<P> {
    provider: P,
    contract_address: Address,
    metrics: Option<Metrics>,
}

impl<P> RpcLogSource<P>
where
    P: Provider<AnyNetwork>,
{
    pub fn new(provider: P, contract_address: Address, metrics: Option<Metrics>) -> Self {
        Self {
            provider,
            contract_address,
            metrics,
        }
    }

    fn record_request(&self, method: &'static str) {
        if let Some(m) = &self.metrics {
            m.rpc_requests.add(
                1,
                &[
                    KeyValue::new("chain", m.chain_name.clone()),
                    KeyValue::new("method", method),
                ],
            );
        }
    }

    fn record_outcome(&self, method: &'static str, start: Instant, failed: bool) {
        if let Some(m) = &self.metrics {
            let labels = [
                KeyValue::new("chain", m.chain_name.clone()),
                KeyValue::new("method", method),
            ];
            m.rpc_latency.record(start.elapsed().as_secs_f64(), &labels);
            if failed {
                m.rpc_errors.add(1, &labels);
            }
        }
    }

    /// Timestamp of one block, fetched as a header-only block response.
    async fn block_time(&self, number: u64) -> Result<DateTime<Utc>, FetchError> {
        let start = Instant::now();
        self.record_request("get_block_by_number");
        let result = self.provider.get_block_by_number(number.into()).await;
        self.record_outcome("get_block_by_number", start, result.is_err());

        let block = result
            .map_err(|e| FetchError::Transport(e.to_string()))?
            .ok_or(FetchError::MissingBlock { block: number })?;

        DateTime::from_timestamp(block.header.inner.timestamp as i64, 0)
            .ok_or(FetchError::MissingField { field: "timestamp" })
    }
}

impl<P> LogSource for RpcLogSource<P>
where
    P: Provider<AnyNetwork>,
{
    async fn head_block(&self) -> Result<u64, FetchError> {
        let start = Instant::now();
        self.record_request("get_block_number");
        let result = self.provider.get_block_number().await;
        self.record_outcome("get_block_number", start, result.is_err());

        result.map_err(|e| FetchError::Transport(e.to_string()))
    }

    async fn fetch_logs(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<FetchOutcome, FetchError> {
        let filter = Filter::new()
            .address(self.contract_address)
            .from_block(from_block)
            .to_block(to_block);

        let start = Instant::now();
        self.record_request("get_logs");
        let result = self.provider.get_logs(&filter).await;
        self.record_outcome("get_logs", start, result.is_err());
        let logs = result.map_err(|e| FetchError::Transport(e.to_string()))?;

        // Resolve timestamps for every block that carried a log.
        let mut block_numbers: Vec<u64> = logs.iter().filter_map(|l| l.block_number).collect();
        block_numbers.sort_unstable();
        block_numbers.dedup();

        let fetched =
            futures::future::join_all(block_numbers.iter().map(|n| self.block_time(*n))).await;
        let mut block_times = HashMap::with_capacity(block_numbers.len());
        for (number, result) in block_numbers.iter().zip(fetched) {
            block_times.insert(*number, result?);
        }

        let mut events = Vec::with_capacity(logs.len());
        for log in logs {
            // Providers that report reorged-out logs mark them removed.
            if log.removed {
                continue;
            }
            let block_number = log.block_number.ok_or(FetchError::MissingField {
                field: "blockNumber",
            })?;
            let tx_hash = log.transaction_hash.ok_or(FetchError::MissingField {
                field: "transactionHash",
            })?;
            let log_index = log
                .log_index
                .ok_or(FetchError::MissingField { field: "logIndex" })?;
            let block_time = *block_times
                .get(&block_number)
                .ok_or(FetchError::MissingBlock {
                    block: block_number,
                })?;

            events.push(RawLogEvent {
                contract_address: log.inner.address,
                topics: log.inner.data.topics().to_vec(),
                data: log.inner.data.data.clone(),
                block_number,
                block_time,
                tx_hash,
                log_index,
            });
        }
        events.sort_by_key(|e| (e.block_number, e.log_index));

        Ok(FetchOutcome::Batch(events))
    }
}
