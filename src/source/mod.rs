pub mod rpc;

pub use rpc::RpcLogSource;

use crate::models::errors::FetchError;
use crate::models::logs::RawLogEvent;

/// Outcome of a single fetch against a log source.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Logs for the requested range, ordered by `(block_number, log_index)`.
    Batch(Vec<RawLogEvent>),
    /// The source invalidated previously served blocks; everything after
    /// `rollback_to` must be re-ingested.
    Reorg { rollback_to: u64 },
}

/// A provider of ordered, block-numbered log records for one contract.
///
/// The pipeline only ever asks two questions: where the chain head is, and
/// what the logs for a bounded range are. Retrying is the driver's job, so
/// implementations should surface failures instead of looping internally.
#[allow(async_fn_in_trait)]
pub trait LogSource {
    async fn head_block(&self) -> Result<u64, FetchError>;

    async fn fetch_logs(&self, from_block: u64, to_block: u64)
    -> Result<FetchOutcome, FetchError>;
}

impl<T: LogSource> LogSource for std::sync::Arc<T> {
    async fn head_block(&self) -> Result<u64, FetchError> {
        (**self).head_block().await
    }

    async fn fetch_logs(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<FetchOutcome, FetchError> {
        (**self).fetch_logs(from_block, to_block).await
    }
}
