//! Retry policy with exponential backoff
//!
//! The retry loop never looks at errors directly: every attempt reports an
//! [`Attempt`] classification and the loop decides whether to stop, wait or
//! give up based on that alone.

use async_trait::async_trait;
use log::{debug, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for one retry budget
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Growth factor applied per attempt
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Same schedule with a different attempt budget
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Single attempt, no waiting
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// Delay after the given failed attempt (1-based).
    ///
    /// With the defaults this is `min(60s, 2^attempt s)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let scaled = self.base_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped = scaled.min(self.max_delay.as_secs_f64());
        if capped.is_finite() && capped > 0.0 {
            Duration::from_secs_f64(capped)
        } else {
            Duration::ZERO
        }
    }
}

/// Classification of a single attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt<T> {
    /// Accept this value and stop
    Success(T),
    /// Worth retrying. `value` carries whatever was received, if anything,
    /// so callers that want the last response on exhaustion can have it.
    Transient { reason: String, value: Option<T> },
    /// Retrying cannot help
    Permanent(String),
}

impl<T> Attempt<T> {
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::Transient {
            reason: reason.into(),
            value: None,
        }
    }

    pub fn rejected(reason: impl Into<String>, value: T) -> Self {
        Self::Transient {
            reason: reason.into(),
            value: Some(value),
        }
    }
}

/// Final result of a retried operation
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome<T> {
    Success(T),
    Permanent(String),
    /// Budget spent. `last` is the most recent value any attempt produced.
    Exhausted { attempts: u32, last: Option<T> },
}

impl<T> RetryOutcome<T> {
    /// The accepted value, discarding failure detail
    pub fn success(self) -> Option<T> {
        match self {
            RetryOutcome::Success(value) => Some(value),
            _ => None,
        }
    }

    /// The accepted value, or the last rejected one after exhaustion
    pub fn success_or_last(self) -> Option<T> {
        match self {
            RetryOutcome::Success(value) => Some(value),
            RetryOutcome::Exhausted { last, .. } => last,
            RetryOutcome::Permanent(_) => None,
        }
    }
}

/// Something that can wait. Swapped out in tests so backoff is observable.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A retry budget bound to a sleeper
#[derive(Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    pub fn new(config: RetryConfig, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { config, sleeper }
    }

    pub fn with_tokio(config: RetryConfig) -> Self {
        Self::new(config, Arc::new(TokioSleeper))
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn sleeper(&self) -> &Arc<dyn Sleeper> {
        &self.sleeper
    }

    /// Run `operation` until it succeeds, fails permanently or the budget is spent.
    ///
    /// `operation` receives the 1-based attempt number. There is no wait
    /// after the final attempt.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Attempt<T>>,
    {
        let attempts = self.config.max_attempts.max(1);
        let mut last = None;

        for attempt in 1..=attempts {
            match operation(attempt).await {
                Attempt::Success(value) => {
                    if attempt > 1 {
                        debug!("{}: succeeded on attempt {}/{}", label, attempt, attempts);
                    }
                    return RetryOutcome::Success(value);
                }
                Attempt::Permanent(reason) => {
                    warn!("{}: permanent failure, not retrying: {}", label, reason);
                    return RetryOutcome::Permanent(reason);
                }
                Attempt::Transient { reason, value } => {
                    if value.is_some() {
                        last = value;
                    }
                    warn!(
                        "{}: attempt {}/{} failed: {}",
                        label, attempt, attempts, reason
                    );
                    if attempt < attempts {
                        let delay = self.config.delay_for_attempt(attempt);
                        debug!("{}: waiting {:?} before retry", label, delay);
                        self.sleeper.sleep(delay).await;
                    }
                }
            }
        }

        warn!("{}: all {} attempts failed", label, attempts);
        RetryOutcome::Exhausted { attempts, last }
    }
}
