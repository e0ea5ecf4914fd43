//! Metrics-based observability hooks for provider operations and turns.
//!
//! ```rust
//! use robserve::MetricsObservabilityHooks;
//! use rprovider::ProviderOperationHooks;
//!
//! fn accepts_provider_hooks(_hooks: &dyn ProviderOperationHooks) {}
//!
//! let hooks = MetricsObservabilityHooks;
//! accepts_provider_hooks(&hooks);
//! ```

use std::time::Duration;

use rchat::{ChatError, TurnLifecycleHooks, TurnState};
use rcommon::TurnId;
use rprovider::{ProviderError, ProviderId, ProviderOperationHooks, Usage};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObservabilityHooks;

impl ProviderOperationHooks for MetricsObservabilityHooks {
    fn on_attempt_start(&self, provider: ProviderId, operation: &str, _attempt: u32) {
        metrics::counter!(
            "chatrelay_provider_attempt_start_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
    }

    fn on_retry_scheduled(
        &self,
        provider: ProviderId,
        operation: &str,
        _attempt: u32,
        delay: Duration,
        error: &ProviderError,
    ) {
        metrics::counter!(
            "chatrelay_provider_retry_scheduled_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string(),
            "error_code" => error.code()
        )
        .increment(1);
        metrics::histogram!(
            "chatrelay_provider_retry_delay_seconds",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .record(delay.as_secs_f64());
    }

    fn on_success(&self, provider: ProviderId, operation: &str, attempts: u32) {
        metrics::counter!(
            "chatrelay_provider_success_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
        metrics::histogram!(
            "chatrelay_provider_attempts_per_success",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .record(attempts as f64);
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        operation: &str,
        attempts: u32,
        error: &ProviderError,
    ) {
        metrics::counter!(
            "chatrelay_provider_failure_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string(),
            "error_code" => error.code()
        )
        .increment(1);
        metrics::histogram!(
            "chatrelay_provider_attempts_per_failure",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .record(attempts as f64);
    }
}

impl TurnLifecycleHooks for MetricsObservabilityHooks {
    fn on_turn_started(&self, _turn_id: &TurnId, provider: ProviderId, model: &str) {
        metrics::counter!(
            "chatrelay_turn_started_total",
            "provider" => provider.to_string(),
            "model" => model.to_string()
        )
        .increment(1);
    }

    fn on_state_changed(&self, _turn_id: &TurnId, _from: TurnState, to: TurnState) {
        metrics::counter!("chatrelay_turn_state_transitions_total", "to" => to.as_str())
            .increment(1);
    }

    fn on_turn_committed(&self, _turn_id: &TurnId, usage: &Usage, elapsed: Duration) {
        metrics::counter!("chatrelay_turn_committed_total").increment(1);
        metrics::counter!("chatrelay_turn_input_tokens_total")
            .increment(u64::from(usage.input_tokens));
        metrics::counter!("chatrelay_turn_output_tokens_total")
            .increment(u64::from(usage.output_tokens));
        metrics::histogram!("chatrelay_turn_duration_seconds", "status" => "committed")
            .record(elapsed.as_secs_f64());
    }

    fn on_turn_failed(&self, _turn_id: &TurnId, error: &ChatError, elapsed: Duration) {
        metrics::counter!("chatrelay_turn_failed_total", "error_code" => error.code())
            .increment(1);
        metrics::histogram!("chatrelay_turn_duration_seconds", "status" => "failed")
            .record(elapsed.as_secs_f64());
    }
}
