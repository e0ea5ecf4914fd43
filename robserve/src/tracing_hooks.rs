//! Tracing-based observability hooks for provider operations and turns.
//!
//! ```rust
//! use rchat::TurnLifecycleHooks;
//! use robserve::TracingObservabilityHooks;
//!
//! fn accepts_turn_hooks(_hooks: &dyn TurnLifecycleHooks) {}
//!
//! let hooks = TracingObservabilityHooks;
//! accepts_turn_hooks(&hooks);
//! ```

use std::time::Duration;

use rchat::{ChatError, TurnLifecycleHooks, TurnState};
use rcommon::TurnId;
use rprovider::{ProviderError, ProviderId, ProviderOperationHooks, Usage};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObservabilityHooks;

impl ProviderOperationHooks for TracingObservabilityHooks {
    fn on_attempt_start(&self, provider: ProviderId, operation: &str, attempt: u32) {
        tracing::info!(
            phase = "provider",
            event = "attempt_start",
            provider = %provider,
            operation,
            attempt
        );
    }

    fn on_retry_scheduled(
        &self,
        provider: ProviderId,
        operation: &str,
        attempt: u32,
        delay: Duration,
        error: &ProviderError,
    ) {
        tracing::warn!(
            phase = "provider",
            event = "retry_scheduled",
            provider = %provider,
            operation,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error_code = error.code(),
            retryable = error.retryable,
            error = %error
        );
    }

    fn on_success(&self, provider: ProviderId, operation: &str, attempts: u32) {
        tracing::info!(
            phase = "provider",
            event = "success",
            provider = %provider,
            operation,
            attempts
        );
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        operation: &str,
        attempts: u32,
        error: &ProviderError,
    ) {
        tracing::error!(
            phase = "provider",
            event = "failure",
            provider = %provider,
            operation,
            attempts,
            error_code = error.code(),
            retryable = error.retryable,
            error = %error
        );
    }
}

impl TurnLifecycleHooks for TracingObservabilityHooks {
    fn on_turn_started(&self, turn_id: &TurnId, provider: ProviderId, model: &str) {
        tracing::info!(
            phase = "turn",
            event = "started",
            turn_id = %turn_id,
            provider = %provider,
            model
        );
    }

    fn on_state_changed(&self, turn_id: &TurnId, from: TurnState, to: TurnState) {
        tracing::debug!(
            phase = "turn",
            event = "state_changed",
            turn_id = %turn_id,
            from = from.as_str(),
            to = to.as_str()
        );
    }

    fn on_turn_committed(&self, turn_id: &TurnId, usage: &Usage, elapsed: Duration) {
        tracing::info!(
            phase = "turn",
            event = "committed",
            turn_id = %turn_id,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            reasoning_tokens = usage.reasoning_tokens,
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_turn_failed(&self, turn_id: &TurnId, error: &ChatError, elapsed: Duration) {
        if error.is_cancelled() {
            tracing::info!(
                phase = "turn",
                event = "cancelled",
                turn_id = %turn_id,
                elapsed_ms = elapsed.as_millis() as u64
            );
            return;
        }

        tracing::error!(
            phase = "turn",
            event = "failed",
            turn_id = %turn_id,
            error_code = error.code(),
            retryable = error.is_retryable(),
            elapsed_ms = elapsed.as_millis() as u64,
            error = %error
        );
    }
}
