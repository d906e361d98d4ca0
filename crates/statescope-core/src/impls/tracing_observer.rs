//! TracingObserver - observer イベントを tracing に流す
//!
//! Install it with `Store::set_observer` or `StoreBuilder::observer` to get
//! a log line for every scope lifecycle event.

use tracing::{info, warn};

use crate::domain::{ActionRejection, ScopeEvent};
use crate::ports::StoreObserver;
use crate::scope::Scope;

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl StoreObserver for TracingObserver {
    fn on_create(&self, scope: &Scope) {
        info!(
            scope = %scope.name(),
            composite = scope.is_composite(),
            state = %scope.state(),
            "scope created"
        );
    }

    fn on_change(&self, scope: &Scope) {
        info!(
            scope = %scope.name(),
            locked = scope.is_locked(),
            actions = ?scope.supported_actions(),
            "scope changed"
        );
    }

    fn on_action(&self, event: &ScopeEvent) {
        info!(
            scope = %event.scope_name,
            action = %event.action_name,
            props = %event.props,
            old_state = %event.old_state,
            new_state = %event.new_state,
            "action dispatched"
        );
    }

    fn on_action_error(&self, error: &ActionRejection) {
        warn!(
            scope = %error.scope_name,
            action = %error.action_name,
            reason = %error.reason,
            "action rejected"
        );
    }
}
