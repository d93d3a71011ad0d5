//! # Retry Policy
//!
//! Bounded re-attempts with exponential backoff. Between attempt `k` and
//! `k + 1` the policy sleeps `base_delay * backoff_factor^(k - 1)`, capped at
//! `max_delay`.
//!
//! Errors opt out of retrying through [`Retryable`]; a permanent error ends
//! the loop after the attempt that produced it. Every scheduled retry is
//! reported to a [`RetryObserver`] before the sleep. Observers see what
//! happens but cannot change it.

use bridge_traits::error::BridgeError;
use core_runtime::config::ShortcutJobConfig;
use core_runtime::events::{BatchEvent, CoreEvent, EventBus};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

/// Whether an error is worth another attempt.
pub trait Retryable {
    fn is_retryable(&self) -> bool {
        true
    }
}

impl Retryable for BridgeError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}

/// A failed attempt that will be retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryNotice<'a> {
    /// The attempt that just failed, 1-based
    pub attempt: u32,
    pub max_attempts: u32,
    /// Sleep before the next attempt
    pub delay: Duration,
    pub error: &'a str,
}

pub trait RetryObserver: Send + Sync {
    fn on_retry(&self, notice: &RetryNotice<'_>);
}

impl<F> RetryObserver for F
where
    F: Fn(&RetryNotice<'_>) + Send + Sync,
{
    fn on_retry(&self, notice: &RetryNotice<'_>) {
        self(notice)
    }
}

/// Logs each retry at `warn`.
#[derive(Debug, Clone)]
pub struct LoggingRetryObserver {
    operation: String,
}

impl LoggingRetryObserver {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }
}

impl RetryObserver for LoggingRetryObserver {
    fn on_retry(&self, notice: &RetryNotice<'_>) {
        warn!(
            operation = %self.operation,
            attempt = notice.attempt,
            max_attempts = notice.max_attempts,
            delay_ms = notice.delay.as_millis() as u64,
            error = notice.error,
            "Attempt failed, retrying"
        );
    }
}

/// Publishes [`BatchEvent::RetryScheduled`] for one worklist row.
#[derive(Clone)]
pub struct EventBusRetryObserver {
    bus: EventBus,
    row_index: u64,
}

impl EventBusRetryObserver {
    pub fn new(bus: EventBus, row_index: u64) -> Self {
        Self { bus, row_index }
    }
}

impl RetryObserver for EventBusRetryObserver {
    fn on_retry(&self, notice: &RetryNotice<'_>) {
        let _ = self.bus.emit(CoreEvent::Batch(BatchEvent::RetryScheduled {
            row_index: self.row_index,
            attempt: notice.attempt,
            max_attempts: notice.max_attempts,
            delay_ms: notice.delay.as_millis() as u64,
            error: notice.error.to_string(),
        }));
    }
}

/// The last error once the policy gives up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{error} (after {attempts} attempt(s))")]
pub struct RetryError<E> {
    pub error: E,
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    backoff_factor: f64,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    /// 5 attempts, 1s base delay, doubling, at most 60s per sleep.
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1000),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// `max_attempts` counts the first attempt; values below 1 mean 1, and
    /// factors below 1 mean no growth.
    pub fn new(max_attempts: u32, base_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            backoff_factor: if backoff_factor.is_finite() {
                backoff_factor.max(1.0)
            } else {
                1.0
            },
            ..Self::default()
        }
    }

    pub fn from_config(config: &ShortcutJobConfig) -> Self {
        Self::new(config.max_attempts, config.base_delay(), config.backoff_factor)
            .with_max_delay(config.max_delay())
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Sleep after failed attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }

    /// Run `operation` until it succeeds, fails permanently, or runs out of
    /// attempts. The closure receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut>(
        &self,
        mut operation: F,
        observer: &dyn RetryObserver,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display,
    {
        let mut attempt = 1;
        loop {
            let error = match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if attempt >= self.max_attempts || !error.is_retryable() {
                return Err(RetryError {
                    error,
                    attempts: attempt,
                });
            }

            let delay = self.delay_for(attempt);
            observer.on_retry(&RetryNotice {
                attempt,
                max_attempts: self.max_attempts,
                delay,
                error: &error.to_string(),
            });
            sleep(delay).await;
            attempt += 1;
        }
    }
}
