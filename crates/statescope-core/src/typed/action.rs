//! TypedAction - serde 型で書く action
//!
//! # 学習ポイント
//! - 表層は `Fn(S, P, TypedSettle<S>)` で型安全
//! - 内部は `Action`（`serde_json::Value` ベース）に type erasure
//! - decode / encode の失敗は dispatch の reject になる

use std::marker::PhantomData;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::{Props, State, StoreError};
use crate::scope::{Action, ActionDispatcher, Scope, Settle};

/// TypedSettle は `S` を受け取って JSON に encode してから resolve する
pub struct TypedSettle<S> {
    inner: Settle,
    _marker: PhantomData<fn(S)>,
}

impl<S: Serialize> TypedSettle<S> {
    fn new(inner: Settle) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    pub fn resolve(&self, new_state: S) -> bool {
        match serde_json::to_value(new_state) {
            Ok(value) => self.inner.resolve(value),
            Err(e) => self.inner.reject(format!("json encode: {e}")),
        }
    }

    pub fn reject(&self, reason: impl Into<Value>) -> bool {
        self.inner.reject(reason)
    }

    /// The underlying untyped handle, e.g. to move into a spawned task.
    pub fn untyped(&self) -> Settle {
        self.inner.clone()
    }
}

impl<S> Clone for TypedSettle<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }
}

pub struct TypedAction<S, P, F> {
    f: F,
    _marker: PhantomData<fn(S, P)>,
}

/// Wrap a closure over serde types as an action.
pub fn typed<S, P, F>(f: F) -> TypedAction<S, P, F>
where
    S: Serialize + DeserializeOwned + 'static,
    P: DeserializeOwned + 'static,
    F: Fn(S, P, TypedSettle<S>) + Send + Sync + 'static,
{
    TypedAction {
        f,
        _marker: PhantomData,
    }
}

#[async_trait]
impl<S, P, F> Action for TypedAction<S, P, F>
where
    S: Serialize + DeserializeOwned + 'static,
    P: DeserializeOwned + 'static,
    F: Fn(S, P, TypedSettle<S>) + Send + Sync + 'static,
{
    async fn run(&self, state: State, props: Props, settle: Settle) {
        let state = match S::deserialize(state.value()) {
            Ok(state) => state,
            Err(e) => {
                settle.reject(format!("json decode state: {e}"));
                return;
            }
        };
        let props = match P::deserialize(props.value()) {
            Ok(props) => props,
            Err(e) => {
                settle.reject(format!("json decode props: {e}"));
                return;
            }
        };
        (self.f)(state, props, TypedSettle::new(settle));
    }
}

/// Register `f` on `scope` under `name` as a typed action.
///
/// # Example
/// ```ignore
/// register_typed(&scope, "add", |count: i64, n: i64, settle| {
///     settle.resolve(count + n);
/// })?;
/// ```
pub fn register_typed<S, P, F>(
    scope: &Scope,
    name: &str,
    f: F,
) -> Result<ActionDispatcher, StoreError>
where
    S: Serialize + DeserializeOwned + 'static,
    P: DeserializeOwned + 'static,
    F: Fn(S, P, TypedSettle<S>) + Send + Sync + 'static,
{
    scope.register_action(name, typed(f))
}

/// Decode the current state of `scope` into `T`.
pub fn state_as<T: DeserializeOwned>(scope: &Scope) -> Result<T, serde_json::Error> {
    T::deserialize(scope.state().value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Store;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Cart {
        items: Vec<String>,
    }

    #[derive(Debug, Deserialize)]
    struct AddItem {
        item: String,
    }

    #[tokio::test]
    async fn typed_action_round_trips_through_json_state() {
        let store = Store::new();
        let scope = store
            .create_scope(Some("cart"), json!({ "items": [] }), Vec::new())
            .unwrap();
        let add = register_typed(&scope, "add", |mut cart: Cart, props: AddItem, settle| {
            cart.items.push(props.item);
            settle.resolve(cart);
        })
        .unwrap();

        add.dispatch(json!({ "item": "apple" })).await.unwrap();
        add.dispatch(json!({ "item": "pear" })).await.unwrap();

        let cart: Cart = state_as(&scope).unwrap();
        assert_eq!(cart.items, vec!["apple".to_string(), "pear".to_string()]);
    }

    #[tokio::test]
    async fn undecodable_props_reject_without_touching_state() {
        let store = Store::new();
        let scope = store
            .create_scope(Some("cart"), json!({ "items": [] }), Vec::new())
            .unwrap();
        register_typed(&scope, "add", |cart: Cart, _props: AddItem, settle| {
            settle.resolve(cart);
        })
        .unwrap();

        let rejection = scope
            .dispatch("add", json!({ "wrong": 1 }))
            .unwrap()
            .await
            .unwrap_err();
        assert!(rejection.reason.as_str().unwrap().starts_with("json decode props"));
        assert_eq!(scope.state(), json!({ "items": [] }));
    }
}
