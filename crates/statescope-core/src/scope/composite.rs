//! Composite scope - 複数の子 scope を 1 つにまとめる
//!
//! # 構築手順
//! 構築は 2 段階。失敗しうる処理はすべて前半で済ませ、子には触らない。
//! 1. `compose`: 子を重複排除して 2 つ以上あることを確認し、composite を作り
//!    （middleware の pre_setup がここで走る）、子の action 名の和集合を
//!    fan-out action として登録
//! 2. `adopt_children`: store への登録後、各子を lock してから action 名を
//!    読み直し、subscribe（子のイベントを composite の listener に再送）。
//!    最後に composite を lock

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{Action, ActionDispatcher, Scope, ScopeEnv, ScopeInner, ScopeKind, Settle};
use crate::domain::{Frozen, Props, ScopeEvent, State, StoreError};
use crate::ports::Middleware;

const MIN_CHILDREN: usize = 2;

impl Scope {
    /// Build an unlocked composite with one fan-out action per child action
    /// name. The children are only read, so an error leaves them as they were.
    pub(crate) fn compose(
        name: String,
        children: Vec<Scope>,
        middleware: Vec<Arc<dyn Middleware>>,
        env: Arc<ScopeEnv>,
    ) -> Result<Scope, StoreError> {
        let mut distinct: Vec<Scope> = Vec::with_capacity(children.len());
        for child in children {
            if !distinct.contains(&child) {
                distinct.push(child);
            }
        }
        if distinct.len() < MIN_CHILDREN {
            return Err(StoreError::TooFewChildren {
                scope: name,
                count: distinct.len(),
            });
        }

        let composite = Scope::build(
            name,
            Value::Object(Map::new()),
            middleware,
            ScopeKind::Composite(distinct),
            env,
        );
        if composite.is_locked() {
            return Err(StoreError::LockedDuringSetup {
                scope: composite.name().to_string(),
            });
        }

        let mut action_names: Vec<String> = Vec::new();
        for child in composite.children() {
            for action_name in child.supported_actions() {
                if !action_names.contains(&action_name) {
                    action_names.push(action_name);
                }
            }
        }
        for action_name in &action_names {
            composite.add_fan_out(action_name)?;
        }
        Ok(composite)
    }

    /// Lock and subscribe every child, then lock the composite itself.
    pub(crate) fn adopt_children(&self) {
        for child in self.children() {
            child.lock();
            // closed now; pick up anything registered since `compose` read it
            for action_name in child.supported_actions() {
                if self.supports(&action_name) {
                    continue;
                }
                if let Err(err) = self.add_fan_out(&action_name) {
                    warn!(scope = %self.name(), action = %action_name, "fan-out not added: {err}");
                }
            }

            let parent = Arc::downgrade(&self.inner);
            let child_name = child.name().to_string();
            child.add_listener(
                Vec::new(),
                Arc::new(move |event: &ScopeEvent| {
                    if let Some(inner) = parent.upgrade() {
                        Scope { inner }.republish(&child_name, event);
                    }
                }),
            );
        }
        self.lock();

        debug!(
            scope = %self.name(),
            children = self.children().len(),
            actions = self.supported_actions().len(),
            "composite scope assembled"
        );
    }

    fn add_fan_out(&self, action_name: &str) -> Result<ActionDispatcher, StoreError> {
        self.register_action(
            action_name,
            FanOut {
                action_name: action_name.to_string(),
                children: self.children().to_vec(),
                composite: Arc::downgrade(&self.inner),
            },
        )
    }

    /// Forward a child's event to this composite's listeners, expressed in
    /// terms of the composite state. `scope_name` stays the child's.
    fn republish(&self, child_name: &str, event: &ScopeEvent) {
        let current: State = self.state();
        let mut old = current.thaw();
        if let Value::Object(entries) = &mut old {
            entries.insert(child_name.to_string(), event.old_state.thaw());
        }
        self.inner.listeners.notify(&ScopeEvent {
            old_state: Frozen::new(old),
            new_state: current,
            scope_name: event.scope_name.clone(),
            action_name: event.action_name.clone(),
            props: event.props.clone(),
        });
    }
}

/// Dispatches one action name on every child that supports it and resolves
/// with the recomputed composite state once all of them resolved.
struct FanOut {
    action_name: String,
    children: Vec<Scope>,
    composite: Weak<ScopeInner>,
}

#[async_trait]
impl Action for FanOut {
    async fn run(&self, _state: State, props: Props, settle: Settle) {
        let dispatches = self
            .children
            .iter()
            .filter(|child| child.supports(&self.action_name))
            .map(|child| child.dispatch(&self.action_name, props.clone()))
            .collect::<Result<Vec<_>, _>>();
        let dispatches = match dispatches {
            Ok(dispatches) => dispatches,
            Err(err) => {
                settle.reject(err.to_string());
                return;
            }
        };

        // first rejection wins; the other children keep draining their own queues
        match try_join_all(dispatches).await {
            Ok(_) => match self.composite.upgrade() {
                Some(inner) => settle.resolve(Scope { inner }.state().thaw()),
                None => settle.reject("composite scope no longer exists"),
            },
            Err(rejection) => settle.reject(rejection.to_value()),
        };
    }
}
