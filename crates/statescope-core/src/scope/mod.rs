//! Scope - 名前付きの state セル
//!
//! A scope owns one frozen state value, a table of named actions, an
//! ordered middleware chain, a FIFO dispatch queue and a listener table.
//! The only way to change its state is to dispatch one of its actions.
//!
//! # dispatch の流れ
//! 1. 呼び出し時: action を引き、props を freeze し、queue に turn を取る
//! 2. turn が来たら: old_state を取り、middleware を fold して action を包み、実行
//! 3. resolve: new_state を freeze → publish → observer → listeners → queue を進める
//! 4. reject: state はそのまま → observer → queue を進める → `ActionRejection`

pub mod action;
pub mod composite;
mod listeners;
mod queue;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::domain::{ActionRejection, Frozen, Props, ScopeEvent, State, StoreError};
use crate::ports::{IdGenerator, Middleware, ObserverSlot};

pub use self::action::{Action, AsyncAction, FnAction, Outcome, Settle, SharedAction, from_async, from_fn};
pub use self::listeners::{Listener, SyncTarget};
pub use self::queue::DispatchHandle;

use self::listeners::ListenerRegistry;
use self::queue::{DispatchQueue, Turn};

/// Names an action may not take because the scope itself uses them.
pub const RESERVED_NAMES: &[&str] = &[
    "name",
    "state",
    "is_locked",
    "is_composite",
    "children",
    "supported_actions",
    "supports",
    "pending_dispatches",
    "listener_count",
    "register_action",
    "dispatch",
    "subscribe",
    "unsubscribe",
    "synchronize",
    "lock",
];

/// Shared by a store and every scope it creates.
pub(crate) struct ScopeEnv {
    pub(crate) observer: ObserverSlot,
    pub(crate) ids: Arc<dyn IdGenerator>,
    pub(crate) listener_prefix: String,
}

enum ScopeKind {
    Plain,
    Composite(Vec<Scope>),
}

struct ScopeInner {
    name: String,
    state: Mutex<State>,
    locked: AtomicBool,
    /// Registration order is kept; `supported_actions` reports it.
    actions: Mutex<Vec<(String, SharedAction)>>,
    /// Stored reversed: folding front to back leaves the first supplied
    /// middleware outermost.
    middleware: Vec<Arc<dyn Middleware>>,
    queue: Mutex<DispatchQueue>,
    listeners: ListenerRegistry,
    kind: ScopeKind,
    env: Arc<ScopeEnv>,
}

/// Scope は cheap-clone なハンドル
///
/// Clones refer to the same scope; equality is identity.
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

impl Scope {
    pub(crate) fn new(
        name: String,
        initial_state: Value,
        middleware: Vec<Arc<dyn Middleware>>,
        env: Arc<ScopeEnv>,
    ) -> Self {
        Self::build(name, initial_state, middleware, ScopeKind::Plain, env)
    }

    fn build(
        name: String,
        initial_state: Value,
        mut middleware: Vec<Arc<dyn Middleware>>,
        kind: ScopeKind,
        env: Arc<ScopeEnv>,
    ) -> Self {
        middleware.reverse();
        let scope = Self {
            inner: Arc::new(ScopeInner {
                name,
                state: Mutex::new(Frozen::new(initial_state)),
                locked: AtomicBool::new(false),
                actions: Mutex::new(Vec::new()),
                middleware,
                queue: Mutex::new(DispatchQueue::default()),
                listeners: ListenerRegistry::default(),
                kind,
                env,
            }),
        };
        for m in scope.inner.middleware.iter().rev() {
            m.pre_setup(&scope);
        }
        scope
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Current state. For a composite this is recomputed on every call as a
    /// record of child name to child state.
    pub fn state(&self) -> State {
        match &self.inner.kind {
            ScopeKind::Plain => self.inner.state.lock().clone(),
            ScopeKind::Composite(children) => Frozen::new(Value::Object(
                children
                    .iter()
                    .map(|child| (child.name().to_string(), child.state().thaw()))
                    .collect(),
            )),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.inner.locked.load(Ordering::SeqCst)
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.inner.kind, ScopeKind::Composite(_))
    }

    /// Children of a composite scope, empty for a plain one.
    pub fn children(&self) -> &[Scope] {
        match &self.inner.kind {
            ScopeKind::Plain => &[],
            ScopeKind::Composite(children) => children,
        }
    }

    pub fn supported_actions(&self) -> Vec<String> {
        self.inner
            .actions
            .lock()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn supports(&self, action_name: &str) -> bool {
        self.find_action(action_name).is_some()
    }

    /// Dispatches currently executing or waiting on this scope.
    pub fn pending_dispatches(&self) -> usize {
        self.inner.queue.lock().len()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    fn find_action(&self, action_name: &str) -> Option<SharedAction> {
        self.inner
            .actions
            .lock()
            .iter()
            .find(|(name, _)| name == action_name)
            .map(|(_, action)| Arc::clone(action))
    }

    /// Register a new action and return a dispatcher bound to it.
    ///
    /// # Errors
    /// - `ScopeLocked` once `lock()` has been called
    /// - `DuplicateAction` / `ReservedActionName` for a taken name
    pub fn register_action(
        &self,
        name: &str,
        action: impl Action + 'static,
    ) -> Result<ActionDispatcher, StoreError> {
        let action: SharedAction = Arc::new(action);
        {
            let mut actions = self.inner.actions.lock();
            if self.is_locked() {
                return Err(StoreError::ScopeLocked {
                    scope: self.name().to_string(),
                    action: name.to_string(),
                });
            }
            if RESERVED_NAMES.contains(&name) {
                return Err(StoreError::ReservedActionName {
                    scope: self.name().to_string(),
                    action: name.to_string(),
                });
            }
            if actions.iter().any(|(existing, _)| existing == name) {
                return Err(StoreError::DuplicateAction {
                    scope: self.name().to_string(),
                    action: name.to_string(),
                });
            }
            actions.push((name.to_string(), Arc::clone(&action)));
        }
        debug!(scope = %self.name(), action = %name, "action registered");
        if let Some(observer) = self.inner.env.observer.get() {
            observer.on_change(self);
        }
        Ok(ActionDispatcher {
            scope: self.clone(),
            name: name.to_string(),
            action,
        })
    }

    /// Queue a dispatch of `action_name` with `props`.
    ///
    /// The unknown-action check happens here, synchronously. Everything
    /// after that is reported through the returned handle, which fails
    /// only when the action rejects.
    ///
    /// # Errors
    /// `ActionNotFound` if no action is registered under `action_name`.
    ///
    /// # Panics
    /// When called outside a tokio runtime, since the execution is spawned
    /// onto the ambient one.
    pub fn dispatch(
        &self,
        action_name: &str,
        props: impl Into<Props>,
    ) -> Result<DispatchHandle, StoreError> {
        let action = self
            .find_action(action_name)
            .ok_or_else(|| StoreError::ActionNotFound {
                scope: self.name().to_string(),
                action: action_name.to_string(),
            })?;
        Ok(self.enqueue(action_name.to_string(), action, props.into()))
    }

    fn enqueue(&self, action_name: String, action: SharedAction, props: Props) -> DispatchHandle {
        let turn = self.inner.queue.lock().enqueue();
        let scope = self.clone();
        DispatchHandle::new(tokio::spawn(async move {
            scope.execute(action_name, action, props, turn).await
        }))
    }

    async fn execute(
        self,
        action_name: String,
        action: SharedAction,
        props: Props,
        turn: Turn,
    ) -> Result<State, ActionRejection> {
        if turn.await.is_err() {
            // the queue never drops a live waiter
            return std::future::pending().await;
        }
        let _turn = TurnGuard { scope: &self };

        let old_state = self.state();
        let wrapped = self
            .inner
            .middleware
            .iter()
            .fold(action, |inner, m| m.wrap(inner));
        debug!(scope = %self.name(), action = %action_name, "dispatch started");

        let (settle, outcome) = Settle::channel();
        let runner = tokio::spawn({
            let state = old_state.clone();
            let props = props.clone();
            async move { wrapped.run(state, props, settle).await }
        });

        let outcome = match outcome.await {
            Ok(outcome) => outcome,
            Err(_) => match runner.await {
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                // every settle handle dropped without a call
                _ => return std::future::pending().await,
            },
        };

        match outcome {
            Ok(new_state) => Ok(self.commit(action_name, old_state, props, Frozen::new(new_state))),
            Err(reason) => Err(self.fail(action_name, old_state, props, reason)),
        }
    }

    fn commit(&self, action_name: String, old_state: State, props: Props, new_state: State) -> State {
        *self.inner.state.lock() = new_state.clone();
        debug!(scope = %self.name(), action = %action_name, "dispatch resolved");

        let event = ScopeEvent {
            old_state,
            new_state: new_state.clone(),
            scope_name: self.name().to_string(),
            action_name,
            props,
        };
        if let Some(observer) = self.inner.env.observer.get() {
            observer.on_action(&event);
            observer.on_change(self);
        }
        self.inner.listeners.notify(&event);
        new_state
    }

    fn fail(&self, action_name: String, old_state: State, props: Props, reason: Value) -> ActionRejection {
        debug!(scope = %self.name(), action = %action_name, %reason, "dispatch rejected");
        let rejection = ActionRejection {
            reason,
            old_state,
            scope_name: self.name().to_string(),
            action_name,
            props,
        };
        if let Some(observer) = self.inner.env.observer.get() {
            observer.on_action_error(&rejection);
        }
        rejection
    }

    /// Add a listener, optionally limited to some action names.
    /// An empty `action_names` means every dispatch on this scope.
    ///
    /// # Errors
    /// `UnknownSubscription` if a filter names an action this scope does
    /// not have.
    pub fn subscribe(
        &self,
        listener: impl Fn(&ScopeEvent) + Send + Sync + 'static,
        action_names: &[&str],
    ) -> Result<String, StoreError> {
        self.check_subscription(action_names)?;
        Ok(self.add_listener(
            action_names.iter().map(|a| a.to_string()).collect(),
            Arc::new(listener),
        ))
    }

    /// Insert a listener whose filter has already been checked.
    pub(crate) fn add_listener(&self, action_names: Vec<String>, listener: Listener) -> String {
        let id = self.inner.env.ids.unique_id(&self.inner.env.listener_prefix);
        self.inner.listeners.insert(id.clone(), action_names, listener);
        id
    }

    fn check_subscription(&self, action_names: &[&str]) -> Result<(), StoreError> {
        match action_names.iter().find(|a| !self.supports(a)) {
            Some(unknown) => Err(StoreError::UnknownSubscription {
                scope: self.name().to_string(),
                action: unknown.to_string(),
            }),
            None => Ok(()),
        }
    }

    pub fn unsubscribe(&self, id: &str) -> bool {
        self.inner.listeners.remove(id)
    }

    /// Mirror the state into `target`, now and after every matching dispatch.
    ///
    /// With a `key` the whole state is written under that key. Without one
    /// the state must be a record and each of its entries is copied.
    ///
    /// # Errors
    /// - `UnknownSubscription` for an unknown `action_name`
    /// - `StateNotRecord` when `key` is `None` and the state is not an object
    pub fn synchronize(
        &self,
        target: Arc<dyn SyncTarget>,
        key: Option<&str>,
        action_name: Option<&str>,
    ) -> Result<String, StoreError> {
        let filter: Vec<&str> = action_name.into_iter().collect();
        self.check_subscription(&filter)?;

        let apply: Arc<dyn Fn(&Value) + Send + Sync> = match key {
            Some(key) => {
                let key = key.to_string();
                Arc::new(move |state: &Value| target.assign(&key, state.clone()))
            }
            None if self.state().is_object() => Arc::new(move |state: &Value| {
                if let Value::Object(entries) = state {
                    for (k, v) in entries {
                        target.assign(k, v.clone());
                    }
                }
            }),
            None => {
                return Err(StoreError::StateNotRecord {
                    scope: self.name().to_string(),
                });
            }
        };

        apply(self.state().value());
        self.subscribe(move |event| apply(event.new_state.value()), &filter)
    }

    /// Close the action table for good. Repeated calls do nothing.
    pub fn lock(&self) {
        {
            // same mutex as register_action, so a registration either lands
            // before the lock or sees it
            let _actions = self.inner.actions.lock();
            if self.inner.locked.swap(true, Ordering::SeqCst) {
                return;
            }
        }
        debug!(scope = %self.name(), "scope locked");
        if let Some(observer) = self.inner.env.observer.get() {
            observer.on_change(self);
        }
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Scope {}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("name", &self.inner.name)
            .field("locked", &self.is_locked())
            .field("composite", &self.is_composite())
            .finish_non_exhaustive()
    }
}

/// Advances the owning scope's queue when the executing dispatch finishes,
/// including when it unwinds.
struct TurnGuard<'a> {
    scope: &'a Scope,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        tracing::trace!(scope = %self.scope.name(), "advancing dispatch queue");
        self.scope.inner.queue.lock().advance();
    }
}

/// ActionDispatcher は登録済み action への束縛
///
/// Equivalent to `scope.dispatch(name, props)` without the lookup, so it
/// can not fail synchronously.
#[derive(Clone)]
pub struct ActionDispatcher {
    scope: Scope,
    name: String,
    action: SharedAction,
}

impl ActionDispatcher {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Queue a dispatch of the bound action.
    ///
    /// # Panics
    /// When called outside a tokio runtime.
    pub fn dispatch(&self, props: impl Into<Props>) -> DispatchHandle {
        self.scope
            .enqueue(self.name.clone(), Arc::clone(&self.action), props.into())
    }
}

impl fmt::Debug for ActionDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDispatcher")
            .field("scope", &self.scope.name())
            .field("name", &self.name)
            .finish()
    }
}
