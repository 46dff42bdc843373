//! Bounded retry with linearly scaling backoff.
//!
//! An operation is a closure performing exactly one network attempt. Transient
//! failures consume the attempt budget and trigger a backoff; terminal failures
//! and successes return immediately.

use crate::error::{RetryError, Retryable};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, warn};

/// How the envelope waits between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackoffStrategy {
    /// A single sleep of `base * k` after the k-th transient failure, cut short
    /// when the remaining backoff budget is smaller.
    Linear,
    /// Repeated sleeps of `base * k` until the remaining backoff budget has
    /// elapsed. The first wait usually spends the whole budget, overrunning it
    /// by less than `base * k`.
    #[default]
    Windowed,
}

impl BackoffStrategy {
    /// Parse a strategy name (`linear` or `windowed`).
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "linear" => Some(Self::Linear),
            "windowed" => Some(Self::Windowed),
            _ => None,
        }
    }

    /// Strategy name as accepted by [`BackoffStrategy::parse`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Windowed => "windowed",
        }
    }
}

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Backoff increment; the k-th retry waits `base_backoff * k`
    pub base_backoff: Duration,
    /// Total sleep allowed across the retries of one call
    pub max_backoff: Duration,
    /// Backoff shape
    pub strategy: BackoffStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(1000),
            strategy: BackoffStrategy::default(),
        }
    }
}

impl RetryConfig {
    /// Set the maximum number of attempts.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the backoff increment.
    #[must_use]
    pub const fn with_base_backoff(mut self, delay: Duration) -> Self {
        self.base_backoff = delay;
        self
    }

    /// Set the maximum backoff.
    #[must_use]
    pub const fn with_max_backoff(mut self, delay: Duration) -> Self {
        self.max_backoff = delay;
        self
    }

    /// Set the backoff strategy.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: BackoffStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// Retry policy for executing single-attempt operations with bounded retries.
///
/// The policy holds configuration only. Attempt counters live inside each
/// [`execute`](Self::execute) call, so one policy can serve any number of
/// operations, concurrent or not.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a new retry policy with the given configuration.
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Create a retry policy with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(RetryConfig::default())
    }

    /// Backoff step after the given number of transient failures.
    ///
    /// This is `base_backoff * failures`. Under [`BackoffStrategy::Linear`] it is
    /// also the whole wait, capped at `max_backoff` before the per-call budget
    /// is applied.
    #[must_use]
    pub fn delay_for_retry(&self, failures: u32) -> Duration {
        let step = self.config.base_backoff.saturating_mul(failures);
        match self.config.strategy {
            BackoffStrategy::Linear => step.min(self.config.max_backoff),
            BackoffStrategy::Windowed => step,
        }
    }

    /// Sleep the current task according to the configured strategy, spending
    /// at most `budget`. A windowed wait may overrun the budget by less than
    /// one step. Returns the time actually slept.
    pub async fn backoff(&self, failures: u32, budget: Duration) -> Duration {
        let step = self.delay_for_retry(failures);
        let started = Instant::now();
        match self.config.strategy {
            BackoffStrategy::Linear => tokio::time::sleep(step.min(budget)).await,
            BackoffStrategy::Windowed => {
                if step.is_zero() {
                    return Duration::ZERO;
                }
                while started.elapsed() < budget {
                    tokio::time::sleep(step).await;
                }
            }
        }
        started.elapsed()
    }

    /// Execute an operation, retrying failures that report themselves as
    /// retryable.
    ///
    /// # Errors
    ///
    /// Returns [`RetryError::Terminal`] for the first non-retryable failure and
    /// [`RetryError::Exhausted`] once `max_attempts` transient failures occurred.
    pub async fn execute<F, Fut, T, E>(
        &self,
        operation: &str,
        attempt: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        self.execute_with(operation, attempt, |e: &E| e.is_retryable())
            .await
    }

    /// Execute an operation with an explicit classifier deciding which failures
    /// are transient.
    ///
    /// All waits of one call share `max_backoff` as their budget. Once it is
    /// spent the remaining attempts follow each other without sleeping.
    ///
    /// # Errors
    ///
    /// Returns [`RetryError::Terminal`] when `is_transient` rejects a failure and
    /// [`RetryError::Exhausted`] once `max_attempts` transient failures occurred.
    pub async fn execute_with<F, Fut, T, E, C>(
        &self,
        operation: &str,
        mut attempt: F,
        is_transient: C,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        C: Fn(&E) -> bool,
    {
        let max_attempts = self.max_attempts();
        let mut failures = 0;
        let mut waited = Duration::ZERO;
        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(e) if !is_transient(&e) => return Err(RetryError::Terminal(e)),
                Err(e) => {
                    failures += 1;
                    if failures >= max_attempts {
                        error!(operation, attempts = failures, error = %e, "max retries exceeded");
                        return Err(RetryError::Exhausted {
                            operation: operation.to_string(),
                            attempts: failures,
                            last: e,
                        });
                    }
                    let budget = self.config.max_backoff.saturating_sub(waited);
                    warn!(
                        operation,
                        attempt = failures,
                        delay_ms = millis(self.delay_for_retry(failures)),
                        budget_ms = millis(budget),
                        error = %e,
                        "retrying after transient failure"
                    );
                    waited += self.backoff(failures, budget).await;
                }
            }
        }
    }

    /// Maximum number of attempts. A configured zero still allows one attempt.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    /// The policy configuration.
    #[must_use]
    pub const fn config(&self) -> &RetryConfig {
        &self.config
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::with_defaults()
    }
}
