use alloy_primitives::B256;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    /// `topics[0]` is not one of the tracked event signatures. Expected for
    /// any log the contract emits outside the known ABI; skipped silently.
    #[error("unknown event signature: {topic0}")]
    UnknownSignature { topic0: B256 },
    /// The signature matched but the topics/data do not fit the declared
    /// layout. Indicates a source/ABI mismatch worth investigating.
    #[error("malformed `{signature}` log: {source}")]
    Malformed {
        signature: &'static str,
        #[source]
        source: alloy_sol_types::Error,
    },
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("log source transport error: {0}")]
    Transport(String),
    #[error("log record is missing required field `{field}`")]
    MissingField { field: &'static str },
    #[error("block {block} not available from log source")]
    MissingBlock { block: u64 },
}

#[derive(Error, Debug)]
pub enum CommitError {
    #[error("entity store failure: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("entity store I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("entity serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("corrupt entity payload for `{id}`: {source}")]
    CorruptPayload {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    /// The log source stayed unavailable past the retry budget.
    #[error("log source unavailable after {attempts} attempts: {source}")]
    SourceExhausted {
        attempts: u32,
        #[source]
        source: FetchError,
    },
    /// A batch could not be committed; the cursor was not advanced past it.
    #[error(transparent)]
    Commit(#[from] CommitError),
}
