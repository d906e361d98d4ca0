//! Store - 名前 → scope の登録簿
//!
//! A store is created once per process (or per test) and never torn down.
//! It starts with one default scope under the configured root name, hands
//! every scope it creates the same observer slot and id generator, and
//! refuses to reuse a name.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use super::builder::StoreBuilder;
use super::config::StoreConfig;
use crate::domain::{State, StoreError};
use crate::ports::{
    IdGenerator, Middleware, ObserverSlot, StoreObserver, SystemClock, UlidGenerator,
};
use crate::scope::{Scope, ScopeEnv};

/// A composite child given either directly or by its registered name.
#[derive(Debug, Clone)]
pub enum ScopeRef {
    Name(String),
    Scope(Scope),
}

impl From<&str> for ScopeRef {
    fn from(name: &str) -> Self {
        ScopeRef::Name(name.to_string())
    }
}

impl From<String> for ScopeRef {
    fn from(name: String) -> Self {
        ScopeRef::Name(name)
    }
}

impl From<Scope> for ScopeRef {
    fn from(scope: Scope) -> Self {
        ScopeRef::Scope(scope)
    }
}

impl From<&Scope> for ScopeRef {
    fn from(scope: &Scope) -> Self {
        ScopeRef::Scope(scope.clone())
    }
}

pub struct Store {
    scopes: RwLock<HashMap<String, Scope>>,
    env: Arc<ScopeEnv>,
    config: StoreConfig,
    root: Scope,
}

impl Store {
    /// A store with the default config and no observer.
    pub fn new() -> Self {
        let ids = UlidGenerator::new(SystemClock);
        Self::assemble(StoreConfig::default(), None, Arc::new(ids))
    }

    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    pub(crate) fn assemble(
        config: StoreConfig,
        observer: Option<Arc<dyn StoreObserver>>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        let env = Arc::new(ScopeEnv {
            observer: ObserverSlot::new(observer),
            ids,
            listener_prefix: config.listener_prefix.clone(),
        });
        let root = Scope::new(
            config.root_scope.clone(),
            config.root_state.clone(),
            Vec::new(),
            Arc::clone(&env),
        );
        let mut scopes = HashMap::new();
        scopes.insert(root.name().to_string(), root.clone());

        let store = Self {
            scopes: RwLock::new(scopes),
            env,
            config,
            root,
        };
        store.announce(&store.root, &[]);
        store
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The default scope, present from construction on.
    pub fn root(&self) -> &Scope {
        &self.root
    }

    /// Install or remove the observer for this store and all its scopes.
    /// Takes effect for every notification fired afterwards.
    pub fn set_observer(&self, observer: Option<Arc<dyn StoreObserver>>) {
        self.env.observer.set(observer);
    }

    /// Create and register a scope. Without a `name` one is generated.
    ///
    /// # Errors
    /// `DuplicateScope` if the name is already registered.
    pub fn create_scope(
        &self,
        name: Option<&str>,
        initial_state: Value,
        middleware: Vec<Arc<dyn Middleware>>,
    ) -> Result<Scope, StoreError> {
        let name = match name {
            Some(name) => name.to_string(),
            None => self.env.ids.unique_id(&self.config.scope_prefix),
        };
        self.ensure_free(&name)?;

        let scope = Scope::new(name, initial_state, middleware.clone(), Arc::clone(&self.env));
        self.insert(&scope)?;
        self.announce(&scope, &middleware);
        Ok(scope)
    }

    /// Compose `children` into a new composite scope registered as `name`.
    ///
    /// Children given by name are looked up first; duplicates are dropped
    /// before the at-least-two check. Every child is locked, but only once
    /// nothing can fail any more: on error the children are left unlocked
    /// and unsubscribed.
    ///
    /// # Errors
    /// - `DuplicateScope` if `name` is taken
    /// - `ScopeNotFound` for an unknown child name
    /// - `TooFewChildren` / `LockedDuringSetup` from composition
    pub fn compose_scope(
        &self,
        name: &str,
        children: impl IntoIterator<Item = ScopeRef>,
        middleware: Vec<Arc<dyn Middleware>>,
    ) -> Result<Scope, StoreError> {
        self.ensure_free(name)?;
        let children = children
            .into_iter()
            .map(|child| match child {
                ScopeRef::Name(child_name) => self.get_scope(&child_name),
                ScopeRef::Scope(scope) => Ok(scope),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let scope = Scope::compose(
            name.to_string(),
            children,
            middleware.clone(),
            Arc::clone(&self.env),
        )?;
        self.insert(&scope)?;
        scope.adopt_children();
        self.announce(&scope, &middleware);
        Ok(scope)
    }

    /// # Errors
    /// `ScopeNotFound` if no scope has that name.
    pub fn get_scope(&self, name: &str) -> Result<Scope, StoreError> {
        self.scopes
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::ScopeNotFound(name.to_string()))
    }

    /// Snapshot of every registered scope's current state, by scope name.
    pub fn get_state(&self) -> BTreeMap<String, State> {
        let scopes: Vec<Scope> = self.scopes.read().values().cloned().collect();
        scopes
            .into_iter()
            .map(|scope| (scope.name().to_string(), scope.state()))
            .collect()
    }

    pub fn scope_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.scopes.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn ensure_free(&self, name: &str) -> Result<(), StoreError> {
        if self.scopes.read().contains_key(name) {
            return Err(StoreError::DuplicateScope(name.to_string()));
        }
        Ok(())
    }

    /// Scopes are built outside the registry lock (middleware hooks run
    /// during construction), so the name is checked again on insert.
    fn insert(&self, scope: &Scope) -> Result<(), StoreError> {
        let mut scopes = self.scopes.write();
        if scopes.contains_key(scope.name()) {
            return Err(StoreError::DuplicateScope(scope.name().to_string()));
        }
        scopes.insert(scope.name().to_string(), scope.clone());
        Ok(())
    }

    fn announce(&self, scope: &Scope, middleware: &[Arc<dyn Middleware>]) {
        for m in middleware {
            m.post_setup(scope);
        }
        debug!(scope = %scope.name(), composite = scope.is_composite(), "scope created");
        if let Some(observer) = self.env.observer.get() {
            observer.on_create(scope);
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use crate::impls::RecordingObserver;
    use crate::scope::from_fn;
    use serde_json::json;

    fn sequential_store() -> Store {
        let config = StoreConfig {
            ids: crate::app::IdStrategy::Sequential,
            ..StoreConfig::default()
        };
        Store::builder().config(config).build().unwrap()
    }

    #[test]
    fn default_scope_is_always_in_the_snapshot() {
        let store = Store::new();
        let state = store.get_state();
        assert_eq!(state.len(), 1);
        assert_eq!(state["rootScope"], json!({}));
        assert_eq!(store.get_scope("rootScope").unwrap(), *store.root());
    }

    #[test]
    fn scope_names_are_unique() {
        let store = Store::new();
        store.create_scope(Some("a"), json!(1), Vec::new()).unwrap();

        let err = store.create_scope(Some("a"), json!(2), Vec::new()).unwrap_err();
        assert_eq!(err, StoreError::DuplicateScope("a".to_string()));
        let err = store.create_scope(Some("rootScope"), json!(2), Vec::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Registration);
        assert_eq!(store.get_scope("a").unwrap().state(), json!(1));
    }

    #[test]
    fn unnamed_scopes_get_generated_names() {
        let store = sequential_store();
        let first = store.create_scope(None, Value::Null, Vec::new()).unwrap();
        let second = store.create_scope(None, Value::Null, Vec::new()).unwrap();
        assert_eq!(first.name(), "scope1");
        assert_eq!(second.name(), "scope2");
    }

    #[test]
    fn missing_scope_is_not_found() {
        let store = Store::new();
        let err = store.get_scope("nope").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn snapshot_lists_every_scope() {
        let store = Store::new();
        store.create_scope(Some("a"), json!(1), Vec::new()).unwrap();
        store.create_scope(Some("b"), json!("x"), Vec::new()).unwrap();

        let state = store.get_state();
        assert_eq!(
            state.keys().cloned().collect::<Vec<_>>(),
            vec!["a".to_string(), "b".to_string(), "rootScope".to_string()]
        );
        assert_eq!(state["b"], json!("x"));
    }

    struct RegistersInPostSetup;

    impl Middleware for RegistersInPostSetup {
        fn post_setup(&self, scope: &Scope) {
            scope
                .register_action("reset", from_fn(|_, _, settle| {
                    settle.resolve(0);
                }))
                .unwrap();
        }
    }

    #[tokio::test]
    async fn post_setup_runs_after_registration() {
        let store = Store::new();
        let middleware: Vec<Arc<dyn Middleware>> = vec![Arc::new(RegistersInPostSetup)];
        let scope = store
            .create_scope(Some("counter"), json!(7), middleware)
            .unwrap();

        assert_eq!(scope.supported_actions(), vec!["reset".to_string()]);
        let state = scope.dispatch("reset", Value::Null).unwrap().await.unwrap();
        assert_eq!(state, json!(0));
    }

    #[test]
    fn observer_is_told_about_creation_and_can_be_replaced() {
        let store = Store::new();
        let first = Arc::new(RecordingObserver::default());
        store.set_observer(Some(first.clone()));
        store.create_scope(Some("a"), Value::Null, Vec::new()).unwrap();

        let second = Arc::new(RecordingObserver::default());
        store.set_observer(Some(second.clone()));
        store.create_scope(Some("b"), Value::Null, Vec::new()).unwrap();

        store.set_observer(None);
        store.create_scope(Some("c"), Value::Null, Vec::new()).unwrap();

        assert_eq!(first.created(), vec!["a".to_string()]);
        assert_eq!(second.created(), vec!["b".to_string()]);
    }

    #[test]
    fn compose_resolves_children_by_name() {
        let store = Store::new();
        store.create_scope(Some("a"), json!(1), Vec::new()).unwrap();
        let b = store.create_scope(Some("b"), json!(2), Vec::new()).unwrap();

        let composite = store
            .compose_scope("ab", [ScopeRef::from("a"), ScopeRef::from(&b)], Vec::new())
            .unwrap();
        assert!(composite.is_composite());
        assert_eq!(store.get_state()["ab"], json!({ "a": 1, "b": 2 }));
    }

    #[test]
    fn compose_with_unknown_child_fails_without_side_effects() {
        let store = Store::new();
        let a = store.create_scope(Some("a"), json!(1), Vec::new()).unwrap();

        let err = store
            .compose_scope("ab", [ScopeRef::from(&a), ScopeRef::from("ghost")], Vec::new())
            .unwrap_err();
        assert_eq!(err, StoreError::ScopeNotFound("ghost".to_string()));
        assert!(!a.is_locked());
        assert!(store.get_scope("ab").is_err());
    }

    #[test]
    fn compose_name_must_be_free() {
        let store = Store::new();
        store.create_scope(Some("a"), json!(1), Vec::new()).unwrap();
        store.create_scope(Some("b"), json!(2), Vec::new()).unwrap();

        let err = store
            .compose_scope("a", [ScopeRef::from("a"), ScopeRef::from("b")], Vec::new())
            .unwrap_err();
        assert_eq!(err, StoreError::DuplicateScope("a".to_string()));
    }
}
