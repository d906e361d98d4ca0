//! StoreObserver port - 開発者ツール向けの通知先
//!
//! The observer only watches. Nothing it returns is consulted, and panics
//! raised inside it are not caught: they unwind into whichever store
//! operation triggered the callback.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::domain::{ActionRejection, ScopeEvent};
use crate::scope::Scope;

/// StoreObserver は scope のライフサイクルを観測する
///
/// # 呼ばれるタイミング
/// - `on_create`: scope / composite scope が store に登録された直後
/// - `on_change`: lock、action 登録、state 更新のたび
/// - `on_action`: dispatch が resolve して state が publish された後
/// - `on_action_error`: dispatch が reject された後
pub trait StoreObserver: Send + Sync {
    fn on_create(&self, _scope: &Scope) {}

    fn on_change(&self, _scope: &Scope) {}

    fn on_action(&self, _event: &ScopeEvent) {}

    fn on_action_error(&self, _error: &ActionRejection) {}
}

/// ObserverSlot は store と全 scope で共有される差し替え可能な参照
///
/// Replacing the observer is not synchronized with in-flight dispatches:
/// whichever observer is installed when a notification fires receives it.
#[derive(Clone, Default)]
pub struct ObserverSlot {
    current: Arc<RwLock<Option<Arc<dyn StoreObserver>>>>,
}

impl ObserverSlot {
    pub fn new(observer: Option<Arc<dyn StoreObserver>>) -> Self {
        Self {
            current: Arc::new(RwLock::new(observer)),
        }
    }

    pub fn set(&self, observer: Option<Arc<dyn StoreObserver>>) {
        *self.current.write() = observer;
    }

    /// Snapshot of the installed observer. The lock is released before the
    /// caller invokes anything on it.
    pub fn get(&self) -> Option<Arc<dyn StoreObserver>> {
        self.current.read().clone()
    }
}
