use serde::{Deserialize, Serialize};
use std::{fmt::Display, future::Future, time::Duration};
use tokio::time::sleep;
use tracing::{error, warn};

/// Backoff parameters for the fetching step. Deserialized from the config
/// file; the defaults match a public RPC endpoint's tolerances.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_delay_ms: 1_000,
            max_delay_ms: 60_000,
            exponential: 2.0,
        }
    }
}

/// Run `operation` until it succeeds or the attempt budget is spent, backing
/// off exponentially with full jitter between attempts. The final error is
/// returned unchanged so callers keep their own error type.
pub async fn retry<F, Fut, T, E>(operation: F, config: &RetryConfig, context: &str) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 1;
    let mut delay = config.base_delay_ms;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if attempt >= config.max_attempts {
                    error!(
                        "Operation '{}' failed after {} attempts. Final error: {}",
                        context, attempt, e
                    );
                    return Err(e);
                }

                warn!(
                    "Attempt {}/{} for '{}' failed: {}. Retrying in {}ms...",
                    attempt, config.max_attempts, context, e, delay
                );

                sleep(Duration::from_millis(delay)).await;

                // Exponential backoff with full jitter
                let next_delay = delay as f64 * config.exponential;
                delay = std::cmp::min(config.max_delay_ms, (fastrand::f64() * next_delay) as u64);
                attempt += 1;
            }
        }
    }
}
