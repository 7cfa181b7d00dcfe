pub mod abi;
pub mod indexer;
pub mod metrics;
pub mod models;
pub mod source;
pub mod storage;
pub mod utils;
