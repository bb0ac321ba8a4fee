//! Generic retry executor with bounded backoff.
//!
//! Remote spreadsheet calls share one failure shape: transient faults
//! (rate limits, server errors) that deserve another attempt, and
//! permanent faults (auth, malformed requests) that must surface
//! immediately. The executor owns the attempt loop and delay math; the
//! caller supplies a [`RetryPolicy`] that classifies errors.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

/// Errors produced by the retry executor itself.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every allowed attempt failed; carries the error from the last one.
    #[error("all {attempts} attempts exhausted: {source}")]
    AttemptsExhausted { attempts: u32, source: E },

    /// The policy classified the error as not worth retrying.
    #[error("non-retryable error: {source}")]
    NonRetryable { source: E },

    /// The total-delay budget ran out before an attempt succeeded.
    #[error("retry budget exceeded after {elapsed:?}")]
    BudgetExceeded { elapsed: Duration, source: E },
}

impl<E> RetryError<E> {
    /// Unwrap the underlying operation error, whatever terminated the loop.
    pub fn into_source(self) -> E {
        match self {
            Self::AttemptsExhausted { source, .. }
            | Self::NonRetryable { source }
            | Self::BudgetExceeded { source, .. } => source,
        }
    }
}

/// Decision returned by a [`RetryPolicy`] for a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the backoff-computed delay.
    Retry,
    /// Retry after a caller-supplied delay (e.g. a `Retry-After` header).
    RetryAfter(Duration),
    /// Surface the error immediately.
    Stop,
}

/// Classifies errors into retryable and fatal.
pub trait RetryPolicy<E> {
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

/// Delay progression between attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Same delay every time.
    Fixed(Duration),
    /// `base * 2^attempt`, capped at `max_delay`.
    Exponential { base: Duration, max_delay: Duration },
}

impl BackoffStrategy {
    /// Delay before retrying after the given 0-based failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Exponential { base, max_delay } => {
                let shift = attempt.min(16);
                let scaled = base.saturating_mul(1u32 << shift);
                scaled.min(*max_delay)
            }
        }
    }
}

/// Randomisation applied to computed delays so concurrent callers
/// don't reconverge on the remote service in lockstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jitter {
    None,
    /// Uniform in `[0, delay]`.
    Full,
    /// Uniform in `[delay/2, delay]`.
    Equal,
}

impl Jitter {
    pub fn apply(&self, delay: Duration) -> Duration {
        match self {
            Self::None => delay,
            Self::Full => Duration::from_millis(pseudo_random(delay.as_millis() as u64)),
            Self::Equal => {
                let half = delay.as_millis() as u64 / 2;
                Duration::from_millis(half + pseudo_random(half))
            }
        }
    }
}

/// Timing-seeded LCG; good enough distribution for jitter without
/// pulling a random-number crate into this tier.
fn pseudo_random(max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    let nanos = u64::from(Instant::now().elapsed().subsec_nanos());
    let mut seed = nanos.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
    seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
    seed % max
}

/// Configuration for the attempt loop.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, initial try included.
    pub max_attempts: u32,
    pub backoff: BackoffStrategy,
    pub jitter: Jitter,
    /// Upper bound on the summed sleep time across all retries.
    pub max_total_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            backoff: BackoffStrategy::Exponential {
                base: Duration::from_millis(250),
                max_delay: Duration::from_secs(30),
            },
            jitter: Jitter::Equal,
            max_total_delay: Duration::from_secs(120),
        }
    }
}

impl RetryConfig {
    /// Validate invariants that would otherwise surface as a hung loop.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be greater than 0".into());
        }
        Ok(())
    }
}

/// Drives an async operation through the configured attempt loop.
pub struct RetryExecutor<P> {
    config: RetryConfig,
    policy: P,
}

impl<P> RetryExecutor<P> {
    pub fn new(config: RetryConfig, policy: P) -> Self {
        Self { config, policy }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `operation` until it succeeds, the policy stops the loop, the
    /// attempt count is exhausted, or the delay budget runs out. The caller
    /// receives either the success value or the final error; in-between
    /// states are never exposed.
    pub async fn execute<F, Fut, T, E>(&self, mut operation: F) -> Result<T, RetryError<E>>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let started = Instant::now();
        let mut total_delay = Duration::ZERO;
        let mut attempt = 0u32;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(attempt = attempt + 1, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if attempt + 1 >= self.config.max_attempts {
                        warn!(
                            attempts = attempt + 1,
                            error = %error,
                            "retry attempts exhausted"
                        );
                        return Err(RetryError::AttemptsExhausted {
                            attempts: attempt + 1,
                            source: error,
                        });
                    }

                    let delay = match self.policy.should_retry(&error, attempt) {
                        RetryDecision::Stop => {
                            debug!(error = %error, "policy stopped retry loop");
                            return Err(RetryError::NonRetryable { source: error });
                        }
                        RetryDecision::Retry => {
                            self.config.jitter.apply(self.config.backoff.delay_for(attempt))
                        }
                        RetryDecision::RetryAfter(delay) => delay,
                    };

                    if total_delay + delay > self.config.max_total_delay {
                        warn!(elapsed = ?started.elapsed(), "retry delay budget exceeded");
                        return Err(RetryError::BudgetExceeded {
                            elapsed: started.elapsed(),
                            source: error,
                        });
                    }

                    warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "operation failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    total_delay += delay;
                    attempt += 1;
                }
            }
        }
    }
}
