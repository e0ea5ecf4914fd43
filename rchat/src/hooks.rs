//! Turn lifecycle hook contracts.
//!
//! ```rust
//! use rchat::{NoopTurnLifecycleHooks, TurnLifecycleHooks};
//!
//! fn accepts_hooks(_hooks: &dyn TurnLifecycleHooks) {}
//!
//! let hooks = NoopTurnLifecycleHooks;
//! accepts_hooks(&hooks);
//! ```

use std::time::Duration;

use rcommon::TurnId;
use rprovider::{ProviderId, Usage};

use crate::{ChatError, TurnState};

pub trait TurnLifecycleHooks: Send + Sync {
    fn on_turn_started(&self, _turn_id: &TurnId, _provider: ProviderId, _model: &str) {}

    fn on_state_changed(&self, _turn_id: &TurnId, _from: TurnState, _to: TurnState) {}

    fn on_turn_committed(&self, _turn_id: &TurnId, _usage: &Usage, _elapsed: Duration) {}

    fn on_turn_failed(&self, _turn_id: &TurnId, _error: &ChatError, _elapsed: Duration) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTurnLifecycleHooks;

impl TurnLifecycleHooks for NoopTurnLifecycleHooks {}
