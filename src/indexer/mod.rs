pub mod decoder;
pub mod mapper;

use opentelemetry::KeyValue;
use tokio::sync::broadcast;
use tokio::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::metrics::Metrics;
use crate::models::entities::Entity;
use crate::models::errors::{DecodeError, PipelineError};
use crate::source::{FetchOutcome, LogSource};
use crate::storage::EntityStore;
use crate::utils::retry::{RetryConfig, retry};

/// Driver phases. `Failed` is terminal; everything else loops back to `Idle`
/// once per committed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Fetching,
    Decoding,
    Mapping,
    Committing,
    Failed,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// First block to ingest when the store holds no cursor yet.
    pub start_block: u64,
    pub batch_size: u64,
    /// Blocks to stay behind the chain head.
    pub chain_tip_buffer: u64,
    /// Sleep between head polls once caught up.
    pub poll_interval_ms: u64,
}

/// Per-batch accounting, returned so callers (and tests) can see what a step
/// actually did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub from_block: u64,
    pub to_block: u64,
    pub logs_seen: usize,
    pub entities_committed: usize,
    pub unknown_skipped: usize,
    pub malformed_skipped: usize,
}

#[derive(Debug)]
pub enum StepOutcome {
    /// The range was fetched, decoded, mapped and committed; the cursor now
    /// points at `to_block`.
    Committed(BatchOutcome),
    /// The source invalidated blocks; the cursor was rolled back.
    RolledBack { rollback_to: u64 },
    /// Nothing to do yet; the next range is still inside the tip buffer.
    AtHead { head: u64 },
}

/// One ingestion pipeline instance: a log source, an entity store, and the
/// cursor that ties them together. All state is owned here; nothing is
/// process-global, so independent instances can run side by side.
pub struct Pipeline<S, St> {
    source: S,
    store: St,
    config: PipelineConfig,
    retry_config: RetryConfig,
    metrics: Option<Metrics>,
    shutdown: broadcast::Receiver<()>,
    state: PipelineState,
}

impl<S, St> Pipeline<S, St>
where
    S: LogSource,
    St: EntityStore,
{
    pub fn new(
        source: S,
        store: St,
        config: PipelineConfig,
        retry_config: RetryConfig,
        metrics: Option<Metrics>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            source,
            store,
            config,
            retry_config,
            metrics,
            shutdown,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn store(&self) -> &St {
        &self.store
    }

    /// Next block to ingest: one past the committed cursor, or the configured
    /// start block on a fresh store.
    fn next_from_block(&self) -> Result<u64, PipelineError> {
        Ok(match self.store.last_processed_block()? {
            Some(last) => last + 1,
            None => self.config.start_block,
        })
    }

    /// Run until cancelled or failed. Cancellation is cooperative and only
    /// observed between batches, so the cursor always reflects the last fully
    /// committed range.
    pub async fn run(&mut self) -> Result<(), PipelineError> {
        info!("Starting ingestion at block {}", self.next_from_block()?);

        loop {
            if self.shutdown.try_recv().is_ok() {
                info!("Shutdown requested, stopping between batches");
                self.state = PipelineState::Idle;
                return Ok(());
            }

            match self.step().await {
                Ok(StepOutcome::AtHead { head }) => {
                    debug!("Caught up with chain head {head}, waiting...");
                    tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
                }
                Ok(_) => {}
                Err(e) => {
                    self.state = PipelineState::Failed;
                    error!("Pipeline failed: {e}");
                    return Err(e);
                }
            }
        }
    }

    /// Process at most one batch: fetch, decode, map, commit, advance cursor.
    pub async fn step(&mut self) -> Result<StepOutcome, PipelineError> {
        self.state = PipelineState::Fetching;

        let from_block = self.next_from_block()?;
        let head = retry(
            || self.source.head_block(),
            &self.retry_config,
            "head_block",
        )
        .await
        .map_err(|source| PipelineError::SourceExhausted {
            attempts: self.retry_config.max_attempts,
            source,
        })?;

        if let Some(m) = &self.metrics {
            let labels = [KeyValue::new("chain", m.chain_name.clone())];
            m.chain_head_block.record(head, &labels);
            m.chain_head_lag
                .record(head.saturating_sub(from_block.saturating_sub(1)), &labels);
        }

        // Stay chain_tip_buffer blocks behind the head so shallow reorgs
        // mostly resolve before we ever see their blocks.
        let tip = head.saturating_sub(self.config.chain_tip_buffer);
        if from_block > tip {
            self.state = PipelineState::Idle;
            return Ok(StepOutcome::AtHead { head });
        }
        let to_block = tip.min(from_block + self.config.batch_size.max(1) - 1);

        let batch_start = Instant::now();
        let outcome = retry(
            || self.source.fetch_logs(from_block, to_block),
            &self.retry_config,
            "fetch_logs",
        )
        .await
        .map_err(|source| PipelineError::SourceExhausted {
            attempts: self.retry_config.max_attempts,
            source,
        })?;

        let logs = match outcome {
            FetchOutcome::Reorg { rollback_to } => {
                warn!("Log source reported a reorg, rolling cursor back to block {rollback_to}");
                // Never move the cursor forward on a reorg signal; entities
                // above the rollback point get overwritten as their blocks
                // are re-ingested.
                if self
                    .store
                    .last_processed_block()?
                    .is_some_and(|last| last > rollback_to)
                {
                    self.store.set_last_processed_block(rollback_to)?;
                }
                if let Some(m) = &self.metrics {
                    m.reorg_rollbacks
                        .add(1, &[KeyValue::new("chain", m.chain_name.clone())]);
                }
                self.state = PipelineState::Idle;
                return Ok(StepOutcome::RolledBack { rollback_to });
            }
            FetchOutcome::Batch(logs) => logs,
        };

        self.state = PipelineState::Decoding;
        let mut decoded = Vec::with_capacity(logs.len());
        let mut unknown_skipped = 0usize;
        let mut malformed_skipped = 0usize;
        for log in &logs {
            match decoder::decode(log) {
                Ok(event) => decoded.push((log, event)),
                Err(DecodeError::UnknownSignature { .. }) => {
                    unknown_skipped += 1;
                }
                Err(e @ DecodeError::Malformed { .. }) => {
                    warn!(
                        "Skipping malformed log at block {} index {}: {e}",
                        log.block_number, log.log_index
                    );
                    malformed_skipped += 1;
                }
            }
        }

        self.state = PipelineState::Mapping;
        let entities: Vec<Entity> = decoded
            .into_iter()
            .map(|(log, event)| mapper::map(log, event))
            .collect();

        self.state = PipelineState::Committing;
        for entity in &entities {
            self.store.upsert(entity)?;
        }
        // Cursor moves only after every entity of the batch is durably
        // stored; a crash in between re-derives the same entities on resume.
        self.store.set_last_processed_block(to_block)?;
        self.state = PipelineState::Idle;

        let batch = BatchOutcome {
            from_block,
            to_block,
            logs_seen: logs.len(),
            entities_committed: entities.len(),
            unknown_skipped,
            malformed_skipped,
        };

        if let Some(m) = &self.metrics {
            let labels = [KeyValue::new("chain", m.chain_name.clone())];
            m.logs_fetched.add(batch.logs_seen as u64, &labels);
            m.entities_committed
                .add(batch.entities_committed as u64, &labels);
            m.unknown_signature_logs
                .add(batch.unknown_skipped as u64, &labels);
            m.malformed_logs.add(batch.malformed_skipped as u64, &labels);
            m.batches_committed.add(1, &labels);
            m.last_committed_block.record(to_block, &labels);
            m.batch_processing_time
                .record(batch_start.elapsed().as_secs_f64(), &labels);
        }

        info!(
            "Committed blocks {}..={} ({} logs, {} entities, {} unknown, {} malformed)",
            batch.from_block,
            batch.to_block,
            batch.logs_seen,
            batch.entities_committed,
            batch.unknown_skipped,
            batch.malformed_skipped
        );

        Ok(StepOutcome::Committed(batch))
    }
}
