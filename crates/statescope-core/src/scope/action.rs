//! Action - state を次の値へ進める関数
//!
//! # 二層構造
//! - **Action trait**: object-safe。scope は `Arc<dyn Action>` だけを扱う
//! - **Adapters**: `from_fn`（同期クロージャ）、`from_async`（async クロージャ）
//!
//! An action receives the frozen current state, the frozen props and a
//! `Settle` handle, and finishes the dispatch by calling `resolve` or
//! `reject` on it exactly once.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::domain::{Props, State};

/// What an action settled with: `Ok(new_state)` or `Err(reason)`.
pub type Outcome = Result<Value, Value>;

/// Action は state・props・settle を受け取り、settle で結果を返す
///
/// `run` may return before settling (for example after handing `settle`
/// to a spawned task). The dispatch completes when `settle` is called, not
/// when `run` returns. If no clone of `settle` is ever used, the dispatch
/// never completes and the scope's queue stays blocked behind it.
#[async_trait]
pub trait Action: Send + Sync {
    async fn run(&self, state: State, props: Props, settle: Settle);
}

pub type SharedAction = Arc<dyn Action>;

/// Settle は resolve / reject の生産者側
///
/// Cloneable so it can be moved into several branches; only the first
/// call across all clones has an effect.
#[derive(Clone)]
pub struct Settle {
    slot: Arc<Mutex<Option<oneshot::Sender<Outcome>>>>,
}

impl Settle {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        let settle = Self {
            slot: Arc::new(Mutex::new(Some(tx))),
        };
        (settle, rx)
    }

    /// Complete the dispatch with a new state. Returns `false` if the
    /// dispatch had already been settled.
    pub fn resolve(&self, new_state: impl Into<Value>) -> bool {
        self.finish(Ok(new_state.into()))
    }

    /// Fail the dispatch. Returns `false` if it had already been settled.
    pub fn reject(&self, reason: impl Into<Value>) -> bool {
        self.finish(Err(reason.into()))
    }

    pub fn finish(&self, outcome: Outcome) -> bool {
        let Some(tx) = self.slot.lock().take() else {
            tracing::warn!("action settled more than once; later result ignored");
            return false;
        };
        // the receiver only disappears when the runtime tears the dispatch down
        let _ = tx.send(outcome);
        true
    }

    pub fn is_settled(&self) -> bool {
        self.slot.lock().is_none()
    }
}

/// A synchronous closure used as an action. See [`from_fn`].
pub struct FnAction<F> {
    f: F,
}

/// Wrap `Fn(state, props, settle)` as an action.
///
/// ```ignore
/// scope.register_action("add", from_fn(|state, props, settle| {
///     let n = state.as_i64().unwrap_or(0) + props.as_i64().unwrap_or(0);
///     settle.resolve(n);
/// }))?;
/// ```
pub fn from_fn<F>(f: F) -> FnAction<F>
where
    F: Fn(State, Props, Settle) + Send + Sync + 'static,
{
    FnAction { f }
}

#[async_trait]
impl<F> Action for FnAction<F>
where
    F: Fn(State, Props, Settle) + Send + Sync + 'static,
{
    async fn run(&self, state: State, props: Props, settle: Settle) {
        (self.f)(state, props, settle)
    }
}

/// An async closure used as an action. See [`from_async`].
pub struct AsyncAction<F> {
    f: F,
}

/// Wrap `Fn(state, props) -> impl Future<Output = Outcome>` as an action.
/// The returned outcome settles the dispatch.
pub fn from_async<F, Fut>(f: F) -> AsyncAction<F>
where
    F: Fn(State, Props) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    AsyncAction { f }
}

#[async_trait]
impl<F, Fut> Action for AsyncAction<F>
where
    F: Fn(State, Props) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    async fn run(&self, state: State, props: Props, settle: Settle) {
        let outcome = (self.f)(state, props).await;
        settle.finish(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Frozen;
    use serde_json::json;

    #[tokio::test]
    async fn first_settle_wins() {
        let (settle, rx) = Settle::channel();
        let other = settle.clone();

        assert!(settle.resolve(1));
        assert!(!other.reject("late"));
        assert!(other.is_settled());
        assert_eq!(rx.await.unwrap(), Ok(json!(1)));
    }

    #[tokio::test]
    async fn dropping_every_settle_closes_the_channel() {
        let (settle, rx) = Settle::channel();
        drop(settle);
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn async_adapter_settles_with_its_output() {
        let action = from_async(|state: State, props: Props| async move {
            match (state.as_i64(), props.as_i64()) {
                (Some(s), Some(p)) => Ok(json!(s * p)),
                _ => Err(json!("not a number")),
            }
        });
        let (settle, rx) = Settle::channel();
        action
            .run(Frozen::new(json!(6)), Frozen::new(json!(7)), settle)
            .await;
        assert_eq!(rx.await.unwrap(), Ok(json!(42)));
    }
}
