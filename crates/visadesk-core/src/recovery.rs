//! Retry with exponential backoff for transient failures.
//!
//! [`retry_with_backoff`] re-runs an async operation while a caller-supplied
//! predicate classifies its error as transient. Attempt `n` (0-based) waits
//! `initial_delay * multiplier^n`, capped at `max_delay`, with +/-25% jitter
//! so several clients hitting a recovering backend do not retry in lockstep.
//!
//! ```no_run
//! use visadesk_core::recovery::{retry_with_backoff, RetryConfig};
//!
//! # async fn fetch() -> Result<u32, std::io::Error> { Ok(1) }
//! # async fn example() {
//! let outcome = retry_with_backoff(RetryConfig::for_network(), |_| true, || fetch()).await;
//! println!("{} attempts", outcome.attempts);
//! # }
//! ```

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Fraction of the computed delay added or removed at random.
const JITTER_FRACTION: f64 = 0.25;

/// Backoff policy.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub initial_delay: Duration,
    /// Upper bound for any single wait, jitter included
    pub max_delay: Duration,
    /// Growth factor between consecutive waits
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Policy for calls to the agency backend: 0.5s, 1s, 2s.
    pub fn for_network() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            ..Self::default()
        }
    }

    /// Single attempt.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Wait before retry number `attempt + 1`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let cap = self.max_delay.as_secs_f64();
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base = (self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent)).min(cap);

        let spread = base * JITTER_FRACTION;
        let jitter = if spread > 0.0 {
            rand::rng().random_range(-spread..spread)
        } else {
            0.0
        };

        Duration::from_secs_f64((base + jitter).clamp(0.0, cap))
    }
}

/// Final outcome plus bookkeeping.
#[derive(Debug)]
pub struct RetryResult<T> {
    pub result: T,
    /// Attempts made, at least 1
    pub attempts: u32,
    /// Wall time including waits
    pub total_duration: Duration,
}

/// Run `operation` until it succeeds, fails permanently, or runs out of
/// retries. The last error is returned unchanged.
pub async fn retry_with_backoff<T, E, F, Fut, P>(
    config: RetryConfig,
    should_retry: P,
    mut operation: F,
) -> RetryResult<Result<T, E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let started = Instant::now();
    let mut attempt = 0u32;

    let result = loop {
        let outcome = operation().await;
        attempt += 1;

        let err = match outcome {
            Ok(value) => break Ok(value),
            Err(err) => err,
        };

        if !should_retry(&err) {
            break Err(err);
        }
        if attempt > config.max_retries {
            warn!(attempts = attempt, error = %err, "giving up after retries");
            break Err(err);
        }

        let wait = config.delay_for_attempt(attempt - 1);
        debug!(attempt, wait_ms = wait.as_millis(), error = %err, "transient failure, backing off");
        tokio::time::sleep(wait).await;
    };

    if result.is_ok() && attempt > 1 {
        debug!(attempts = attempt, "succeeded after retry");
    }

    RetryResult {
        result,
        attempts: attempt,
        total_duration: started.elapsed(),
    }
}
