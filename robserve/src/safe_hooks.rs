//! Panic isolation for observer hooks.
//!
//! Hooks run inline on the turn's task. These wrappers catch and log a
//! panicking hook so the turn it observes keeps streaming.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use rchat::{ChatError, TurnLifecycleHooks, TurnState};
use rcommon::TurnId;
use rprovider::{ProviderError, ProviderId, ProviderOperationHooks, Usage};

fn guarded(hook: &'static str, call: impl FnOnce()) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(call)) {
        let reason = panic
            .downcast_ref::<&str>()
            .map(|reason| (*reason).to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        tracing::warn!(phase = "observe", event = "hook_panicked", hook, reason = %reason);
    }
}

pub struct SafeProviderHooks<H> {
    inner: H,
}

impl<H> SafeProviderHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ProviderOperationHooks for SafeProviderHooks<H>
where
    H: ProviderOperationHooks,
{
    fn on_attempt_start(&self, provider: ProviderId, operation: &str, attempt: u32) {
        guarded("on_attempt_start", || {
            self.inner.on_attempt_start(provider, operation, attempt)
        });
    }

    fn on_retry_scheduled(
        &self,
        provider: ProviderId,
        operation: &str,
        attempt: u32,
        delay: Duration,
        error: &ProviderError,
    ) {
        guarded("on_retry_scheduled", || {
            self.inner
                .on_retry_scheduled(provider, operation, attempt, delay, error)
        });
    }

    fn on_success(&self, provider: ProviderId, operation: &str, attempts: u32) {
        guarded("on_success", || {
            self.inner.on_success(provider, operation, attempts)
        });
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        operation: &str,
        attempts: u32,
        error: &ProviderError,
    ) {
        guarded("on_failure", || {
            self.inner.on_failure(provider, operation, attempts, error)
        });
    }
}

pub struct SafeTurnHooks<H> {
    inner: H,
}

impl<H> SafeTurnHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> TurnLifecycleHooks for SafeTurnHooks<H>
where
    H: TurnLifecycleHooks,
{
    fn on_turn_started(&self, turn_id: &TurnId, provider: ProviderId, model: &str) {
        guarded("on_turn_started", || {
            self.inner.on_turn_started(turn_id, provider, model)
        });
    }

    fn on_state_changed(&self, turn_id: &TurnId, from: TurnState, to: TurnState) {
        guarded("on_state_changed", || {
            self.inner.on_state_changed(turn_id, from, to)
        });
    }

    fn on_turn_committed(&self, turn_id: &TurnId, usage: &Usage, elapsed: Duration) {
        guarded("on_turn_committed", || {
            self.inner.on_turn_committed(turn_id, usage, elapsed)
        });
    }

    fn on_turn_failed(&self, turn_id: &TurnId, error: &ChatError, elapsed: Duration) {
        guarded("on_turn_failed", || {
            self.inner.on_turn_failed(turn_id, error, elapsed)
        });
    }
}
