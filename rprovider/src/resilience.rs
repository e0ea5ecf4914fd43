//! Connection retry policy and operational hook contracts.
//!
//! Retries only ever wrap opening an upstream stream. Once a vendor has
//! produced its first event the turn owns the stream and nothing is replayed.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::{ProviderError, ProviderErrorKind, ProviderId};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
    /// Minimum wait after a `rate_limited` response, even past `max_backoff`.
    pub rate_limit_floor: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(4),
            backoff_multiplier: 2.0,
            rate_limit_floor: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    pub fn single_attempt() -> Self {
        Self::new(1)
    }

    /// Returns how long to wait before attempt `attempt + 1`, or `None` when
    /// `error` ends the operation.
    pub fn next_delay(&self, attempt: u32, error: &ProviderError) -> Option<Duration> {
        if !error.retryable || attempt >= self.max_attempts {
            return None;
        }

        let delay = self.backoff_for_attempt(attempt);
        match error.kind {
            ProviderErrorKind::RateLimited => Some(delay.max(self.rate_limit_floor)),
            _ => Some(delay),
        }
    }

    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let scaled = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::from_secs_f64(scaled.min(self.max_backoff.as_secs_f64()))
    }
}

pub trait ProviderOperationHooks: Send + Sync {
    fn on_attempt_start(&self, _provider: ProviderId, _operation: &str, _attempt: u32) {}

    fn on_retry_scheduled(
        &self,
        _provider: ProviderId,
        _operation: &str,
        _attempt: u32,
        _delay: Duration,
        _error: &ProviderError,
    ) {
    }

    fn on_success(&self, _provider: ProviderId, _operation: &str, _attempts: u32) {}

    fn on_failure(
        &self,
        _provider: ProviderId,
        _operation: &str,
        _attempts: u32,
        _error: &ProviderError,
    ) {
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOperationHooks;

impl ProviderOperationHooks for NoopOperationHooks {}

/// Runs `execute` until it succeeds, the policy gives up, or `cancel` fires.
///
/// Cancellation is checked before every attempt and races every backoff
/// sleep; either way the result is a `cancelled` error.
pub async fn execute_with_retry<T, Op, OpFuture>(
    provider: ProviderId,
    operation: &str,
    policy: &RetryPolicy,
    hooks: &dyn ProviderOperationHooks,
    cancel: &CancellationToken,
    mut execute: Op,
) -> Result<T, ProviderError>
where
    Op: FnMut(u32) -> OpFuture,
    OpFuture: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 1;

    loop {
        if cancel.is_cancelled() {
            let error = ProviderError::cancelled();
            hooks.on_failure(provider, operation, attempt - 1, &error);
            return Err(error);
        }

        hooks.on_attempt_start(provider, operation, attempt);
        let error = match execute(attempt).await {
            Ok(value) => {
                hooks.on_success(provider, operation, attempt);
                return Ok(value);
            }
            Err(error) => error,
        };

        let Some(delay) = policy.next_delay(attempt, &error) else {
            hooks.on_failure(provider, operation, attempt, &error);
            return Err(error);
        };

        hooks.on_retry_scheduled(provider, operation, attempt, delay, &error);
        tokio::select! {
            _ = cancel.cancelled() => {
                let error = ProviderError::cancelled();
                hooks.on_failure(provider, operation, attempt, &error);
                return Err(error);
            }
            _ = tokio::time::sleep(delay) => {}
        }
        attempt += 1;
    }
}
