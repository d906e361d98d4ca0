//! Listener registry - id で管理される購読者
//!
//! Listeners run synchronously inside the dispatch that produced the event,
//! after the new state has been published and before the queue moves on.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::domain::ScopeEvent;

pub type Listener = Arc<dyn Fn(&ScopeEvent) + Send + Sync>;

struct Entry {
    id: String,
    /// Empty means every action.
    actions: Vec<String>,
    listener: Listener,
}

impl Entry {
    fn matches(&self, action_name: &str) -> bool {
        self.actions.is_empty() || self.actions.iter().any(|a| a == action_name)
    }
}

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    entries: Mutex<Vec<Entry>>,
}

impl ListenerRegistry {
    pub(crate) fn insert(&self, id: String, actions: Vec<String>, listener: Listener) {
        self.entries.lock().push(Entry {
            id,
            actions,
            listener,
        });
    }

    pub(crate) fn remove(&self, id: &str) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|e| e.id != id);
        entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Invoke every listener whose filter accepts the event, in subscription
    /// order. The registry lock is released first so listeners may subscribe,
    /// unsubscribe or dispatch.
    pub(crate) fn notify(&self, event: &ScopeEvent) {
        let matching: Vec<Listener> = self
            .entries
            .lock()
            .iter()
            .filter(|e| e.matches(&event.action_name))
            .map(|e| Arc::clone(&e.listener))
            .collect();
        tracing::trace!(
            scope = %event.scope_name,
            action = %event.action_name,
            listeners = matching.len(),
            "notifying listeners"
        );
        for listener in matching {
            listener(event);
        }
    }
}

/// SyncTarget は synchronize の書き込み先
pub trait SyncTarget: Send + Sync {
    fn assign(&self, key: &str, value: Value);
}

impl SyncTarget for Mutex<Map<String, Value>> {
    fn assign(&self, key: &str, value: Value) {
        self.lock().insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Frozen;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn event(action: &str) -> ScopeEvent {
        ScopeEvent {
            old_state: Frozen::new(json!(0)),
            new_state: Frozen::new(json!(1)),
            scope_name: "s".to_string(),
            action_name: action.to_string(),
            props: Frozen::new(Value::Null),
        }
    }

    #[test]
    fn filtered_listener_only_sees_its_actions() {
        let registry = ListenerRegistry::default();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        registry.insert(
            "l1".to_string(),
            vec!["inc".to_string()],
            Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        registry.notify(&event("inc"));
        registry.notify(&event("dec"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remove_reports_whether_anything_was_removed() {
        let registry = ListenerRegistry::default();
        registry.insert("l1".to_string(), Vec::new(), Arc::new(|_| {}));
        assert!(registry.remove("l1"));
        assert!(!registry.remove("l1"));
        assert_eq!(registry.len(), 0);
    }
}
