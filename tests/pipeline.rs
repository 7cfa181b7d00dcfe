use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use alloy_primitives::{B256, Bytes, U256, address, b256};
use alloy_sol_types::SolEvent;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use ctf_exchange_indexer::abi;
use ctf_exchange_indexer::indexer::{Pipeline, PipelineConfig, PipelineState, StepOutcome};
use ctf_exchange_indexer::models::entities::{Entity, EntityId, EntityKind};
use ctf_exchange_indexer::models::errors::{FetchError, PipelineError};
use ctf_exchange_indexer::models::logs::RawLogEvent;
use ctf_exchange_indexer::source::{FetchOutcome, LogSource};
use ctf_exchange_indexer::storage::{EntityStore, MemoryStore};
use ctf_exchange_indexer::utils::retry::RetryConfig;

//////////////////////////////// Test log source ////////////////////////////////

/// Scripted in-memory log source: serves a fixed log set, and can be told to
/// fail fetches or report a reorg for the next request.
struct ScriptedSource {
    head: AtomicU64,
    logs: Mutex<Vec<RawLogEvent>>,
    reorg: Mutex<Option<u64>>,
    fail_fetches: AtomicU32,
}

impl ScriptedSource {
    fn new(head: u64, logs: Vec<RawLogEvent>) -> Self {
        Self {
            head: AtomicU64::new(head),
            logs: Mutex::new(logs),
            reorg: Mutex::new(None),
            fail_fetches: AtomicU32::new(0),
        }
    }

    fn set_head(&self, head: u64) {
        self.head.store(head, Ordering::SeqCst);
    }

    fn schedule_reorg(&self, rollback_to: u64) {
        *self.reorg.lock().unwrap() = Some(rollback_to);
    }

    fn fail_next_fetches(&self, count: u32) {
        self.fail_fetches.store(count, Ordering::SeqCst);
    }
}

impl LogSource for ScriptedSource {
    async fn head_block(&self) -> Result<u64, FetchError> {
        Ok(self.head.load(Ordering::SeqCst))
    }

    async fn fetch_logs(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<FetchOutcome, FetchError> {
        if self
            .fail_fetches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(FetchError::Transport("scripted outage".to_string()));
        }

        if let Some(rollback_to) = self.reorg.lock().unwrap().take() {
            return Ok(FetchOutcome::Reorg { rollback_to });
        }

        let logs = self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.block_number >= from_block && l.block_number <= to_block)
            .cloned()
            .collect();
        Ok(FetchOutcome::Batch(logs))
    }
}

//////////////////////////////////// Helpers ////////////////////////////////////

const TX_A: B256 = b256!("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
const TX_B: B256 = b256!("0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");

fn ts(block_number: u64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + block_number as i64, 0).unwrap()
}

fn raw_log(event: &impl SolEvent, block_number: u64, log_index: u64, tx_hash: B256) -> RawLogEvent {
    let log_data = event.encode_log_data();
    RawLogEvent {
        contract_address: address!("0xC5d563A36AE78145C45a50134d48A1215220f80a"),
        topics: log_data.topics().to_vec(),
        data: log_data.data.clone(),
        block_number,
        block_time: ts(block_number),
        tx_hash,
        log_index,
    }
}

fn order_filled_log(block_number: u64, log_index: u64, tx_hash: B256) -> RawLogEvent {
    let event = abi::OrderFilled {
        orderHash: b256!("0x1111111111111111111111111111111111111111111111111111111111111111"),
        maker: address!("0x00000000000000000000000000000000000000aa"),
        taker: address!("0x00000000000000000000000000000000000000bb"),
        makerAssetId: U256::ZERO,
        takerAssetId: U256::from(42u64),
        makerAmountFilled: U256::from(1_000_000u64),
        takerAmountFilled: U256::from(2_000_000u64),
        fee: U256::ZERO,
    };
    raw_log(&event, block_number, log_index, tx_hash)
}

fn order_cancelled_log(block_number: u64, log_index: u64, tx_hash: B256) -> RawLogEvent {
    let event = abi::OrderCancelled {
        orderHash: b256!("0x2222222222222222222222222222222222222222222222222222222222222222"),
    };
    raw_log(&event, block_number, log_index, tx_hash)
}

fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        base_delay_ms: 1,
        max_delay_ms: 2,
        exponential: 2.0,
    }
}

fn test_pipeline(
    source: Arc<ScriptedSource>,
    store: Arc<MemoryStore>,
    start_block: u64,
) -> (
    Pipeline<Arc<ScriptedSource>, Arc<MemoryStore>>,
    broadcast::Sender<()>,
) {
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let config = PipelineConfig {
        start_block,
        batch_size: 10,
        chain_tip_buffer: 0,
        poll_interval_ms: 1,
    };
    let pipeline = Pipeline::new(source, store, config, fast_retry(3), None, shutdown_rx);
    (pipeline, shutdown_tx)
}

///////////////////////////////////// Tests /////////////////////////////////////

#[tokio::test]
async fn order_filled_scenario_round_trips() {
    let source = Arc::new(ScriptedSource::new(100, vec![order_filled_log(100, 3, TX_A)]));
    let store = Arc::new(MemoryStore::new());
    let (mut pipeline, _shutdown_tx) = test_pipeline(source, store.clone(), 100);

    let outcome = pipeline.step().await.unwrap();
    match outcome {
        StepOutcome::Committed(batch) => {
            assert_eq!(batch.from_block, 100);
            assert_eq!(batch.to_block, 100);
            assert_eq!(batch.logs_seen, 1);
            assert_eq!(batch.entities_committed, 1);
            assert_eq!(batch.unknown_skipped, 0);
            assert_eq!(batch.malformed_skipped, 0);
        }
        other => panic!("expected a committed batch, got {other:?}"),
    }

    // Point lookup by the deterministic id
    let id = EntityId::for_log(TX_A, 3);
    let entity = store.get(&id).unwrap().expect("entity must be committed");
    match &entity {
        Entity::OrderFilled(e) => {
            assert_eq!(e.maker_amount_filled, U256::from(1_000_000u64));
            assert_eq!(e.taker_amount_filled, U256::from(2_000_000u64));
            assert_eq!(e.meta.block_number, 100);
            assert_eq!(e.meta.log_index, 3);
            assert_eq!(e.meta.tx_hash, TX_A);
        }
        other => panic!("expected OrderFilled, got {other:?}"),
    }

    // Range scan sees the same committed entity
    let scanned = store
        .scan_by_block_range(EntityKind::OrderFilled, 100, 100)
        .unwrap();
    assert_eq!(scanned, vec![entity]);

    assert_eq!(store.last_processed_block().unwrap(), Some(100));
}

#[tokio::test]
async fn duplicate_logs_produce_a_single_entity() {
    let log = order_filled_log(100, 3, TX_A);
    let source = Arc::new(ScriptedSource::new(100, vec![log.clone(), log]));
    let store = Arc::new(MemoryStore::new());
    let (mut pipeline, _shutdown_tx) = test_pipeline(source, store.clone(), 100);

    pipeline.step().await.unwrap();

    let scanned = store
        .scan_by_block_range(EntityKind::OrderFilled, 100, 100)
        .unwrap();
    assert_eq!(scanned.len(), 1);
}

#[tokio::test]
async fn unknown_and_malformed_logs_are_skipped_without_aborting() {
    let valid = raw_log(
        &abi::TradingPaused {
            pauser: address!("0x00000000000000000000000000000000000000cc"),
        },
        100,
        0,
        TX_A,
    );

    let unknown = RawLogEvent {
        topics: vec![b256!(
            "0xdeaddeaddeaddeaddeaddeaddeaddeaddeaddeaddeaddeaddeaddeaddeaddead"
        )],
        data: Bytes::new(),
        log_index: 1,
        ..valid.clone()
    };

    // Matched signature, truncated data
    let mut malformed = order_filled_log(100, 2, TX_A);
    malformed.data = Bytes::from(malformed.data[..32].to_vec());

    let source = Arc::new(ScriptedSource::new(100, vec![valid, unknown, malformed]));
    let store = Arc::new(MemoryStore::new());
    let (mut pipeline, _shutdown_tx) = test_pipeline(source, store.clone(), 100);

    let outcome = pipeline.step().await.unwrap();
    match outcome {
        StepOutcome::Committed(batch) => {
            assert_eq!(batch.logs_seen, 3);
            assert_eq!(batch.entities_committed, 1);
            assert_eq!(batch.unknown_skipped, 1);
            assert_eq!(batch.malformed_skipped, 1);
        }
        other => panic!("expected a committed batch, got {other:?}"),
    }

    // Skipped logs leave no entities behind, and the batch still advanced.
    assert_eq!(store.get(&EntityId::for_log(TX_A, 1)).unwrap(), None);
    assert_eq!(store.get(&EntityId::for_log(TX_A, 2)).unwrap(), None);
    assert_eq!(store.last_processed_block().unwrap(), Some(100));
}

#[tokio::test]
async fn resume_after_partial_commit_rederives_identical_entities() {
    let logs = vec![
        order_filled_log(100, 0, TX_A),
        order_cancelled_log(101, 1, TX_B),
    ];

    // Reference run: everything committed in one go.
    let reference_store = Arc::new(MemoryStore::new());
    let (mut reference, _tx1) = test_pipeline(
        Arc::new(ScriptedSource::new(101, logs.clone())),
        reference_store.clone(),
        100,
    );
    reference.step().await.unwrap();
    assert_eq!(reference_store.last_processed_block().unwrap(), Some(101));

    // Crashed run: one entity was upserted but the cursor never advanced.
    let crashed_store = Arc::new(MemoryStore::new());
    {
        use ctf_exchange_indexer::indexer::{decoder, mapper};
        let decoded = decoder::decode(&logs[0]).unwrap();
        crashed_store.upsert(&mapper::map(&logs[0], decoded)).unwrap();
    }
    assert_eq!(crashed_store.last_processed_block().unwrap(), None);

    // Restart from scratch: the cursor still points before the batch, so the
    // whole range is reprocessed and overwrites the partial write.
    let (mut resumed, _tx2) = test_pipeline(
        Arc::new(ScriptedSource::new(101, logs)),
        crashed_store.clone(),
        100,
    );
    resumed.step().await.unwrap();

    for kind in [EntityKind::OrderFilled, EntityKind::OrderCancelled] {
        assert_eq!(
            crashed_store.scan_by_block_range(kind, 100, 101).unwrap(),
            reference_store.scan_by_block_range(kind, 100, 101).unwrap(),
        );
    }
    assert_eq!(crashed_store.last_processed_block().unwrap(), Some(101));
}

#[tokio::test]
async fn reorg_rolls_cursor_back_and_reprocessing_overwrites() {
    let logs = vec![
        order_cancelled_log(101, 0, TX_A),
        order_cancelled_log(103, 0, TX_B),
        order_cancelled_log(105, 0, b256!(
            "0xcccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccc"
        )),
    ];
    let source = Arc::new(ScriptedSource::new(105, logs));
    let store = Arc::new(MemoryStore::new());
    let (mut pipeline, _shutdown_tx) = test_pipeline(source.clone(), store.clone(), 100);

    pipeline.step().await.unwrap();
    assert_eq!(store.last_processed_block().unwrap(), Some(105));

    // The undo signal arrives with the next fetch once the head moves on.
    source.set_head(110);
    source.schedule_reorg(102);
    let outcome = pipeline.step().await.unwrap();
    assert!(matches!(
        outcome,
        StepOutcome::RolledBack { rollback_to: 102 }
    ));
    assert_eq!(store.last_processed_block().unwrap(), Some(102));

    // Re-ingesting the invalidated range overwrites by id, never duplicates.
    pipeline.step().await.unwrap();
    assert_eq!(store.last_processed_block().unwrap(), Some(110));
    let scanned = store
        .scan_by_block_range(EntityKind::OrderCancelled, 100, 110)
        .unwrap();
    assert_eq!(scanned.len(), 3);
}

#[tokio::test]
async fn fetch_failures_beyond_budget_fail_the_pipeline() {
    let source = Arc::new(ScriptedSource::new(100, vec![order_filled_log(100, 0, TX_A)]));
    source.fail_next_fetches(10);
    let store = Arc::new(MemoryStore::new());
    let (mut pipeline, _shutdown_tx) = test_pipeline(source, store.clone(), 100);

    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::SourceExhausted { attempts: 3, .. }
    ));
    assert_eq!(pipeline.state(), PipelineState::Failed);
    // The cursor never moves past a batch that could not be fetched.
    assert_eq!(store.last_processed_block().unwrap(), None);
}

#[tokio::test]
async fn fetch_failures_within_budget_recover() {
    let source = Arc::new(ScriptedSource::new(100, vec![order_filled_log(100, 0, TX_A)]));
    source.fail_next_fetches(2);
    let store = Arc::new(MemoryStore::new());
    let (mut pipeline, _shutdown_tx) = test_pipeline(source, store.clone(), 100);

    let outcome = pipeline.step().await.unwrap();
    assert!(matches!(outcome, StepOutcome::Committed(_)));
    assert_eq!(store.last_processed_block().unwrap(), Some(100));
}

#[tokio::test]
async fn cancellation_stops_between_batches_with_cursor_intact() {
    let source = Arc::new(ScriptedSource::new(100, vec![order_filled_log(100, 0, TX_A)]));
    let store = Arc::new(MemoryStore::new());
    let (mut pipeline, shutdown_tx) = test_pipeline(source, store.clone(), 100);

    shutdown_tx.send(()).unwrap();
    pipeline.run().await.unwrap();

    // The shutdown arrived before the first batch, so nothing was ingested.
    assert_eq!(store.last_processed_block().unwrap(), None);
}

#[tokio::test]
async fn stays_behind_the_tip_buffer() {
    let source = Arc::new(ScriptedSource::new(100, vec![order_filled_log(95, 0, TX_A)]));
    let store = Arc::new(MemoryStore::new());
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let config = PipelineConfig {
        start_block: 95,
        batch_size: 10,
        chain_tip_buffer: 12,
        poll_interval_ms: 1,
    };
    let mut pipeline = Pipeline::new(source, store.clone(), config, fast_retry(3), None, shutdown_rx);
    drop(shutdown_tx);

    // head - buffer < start block: nothing is fetched yet.
    let outcome = pipeline.step().await.unwrap();
    assert!(matches!(outcome, StepOutcome::AtHead { head: 100 }));
    assert_eq!(store.last_processed_block().unwrap(), None);
}
