//! RecordingObserver - テスト用に observer 呼び出しを記録する

use parking_lot::Mutex;

use crate::domain::{ActionRejection, ScopeEvent};
use crate::ports::StoreObserver;
use crate::scope::Scope;

#[derive(Default)]
pub(crate) struct RecordingObserver {
    created: Mutex<Vec<String>>,
    changed: Mutex<Vec<String>>,
    actions: Mutex<Vec<ScopeEvent>>,
    errors: Mutex<Vec<ActionRejection>>,
}

impl RecordingObserver {
    pub(crate) fn created(&self) -> Vec<String> {
        self.created.lock().clone()
    }

    pub(crate) fn changed(&self) -> Vec<String> {
        self.changed.lock().clone()
    }

    pub(crate) fn actions(&self) -> Vec<ScopeEvent> {
        self.actions.lock().clone()
    }

    pub(crate) fn errors(&self) -> Vec<ActionRejection> {
        self.errors.lock().clone()
    }
}

impl StoreObserver for RecordingObserver {
    fn on_create(&self, scope: &Scope) {
        self.created.lock().push(scope.name().to_string());
    }

    fn on_change(&self, scope: &Scope) {
        self.changed.lock().push(scope.name().to_string());
    }

    fn on_action(&self, event: &ScopeEvent) {
        self.actions.lock().push(event.clone());
    }

    fn on_action_error(&self, error: &ActionRejection) {
        self.errors.lock().push(error.clone());
    }
}
