//! statescope-core
//!
//! In-process reactive state container: named scopes of frozen state,
//! changed only through registered actions that run one at a time per
//! scope, with listeners, middleware and composite scopes.
//!
//! # モジュール構成
//! - **domain**: 値モデル（Frozen, ScopeEvent, ActionRejection, StoreError）
//! - **ports**: 抽象化レイヤー（Clock, IdGenerator, StoreObserver, Middleware）
//! - **scope**: Scope 本体（action, dispatch queue, listeners, composite）
//! - **app**: Store（scope の登録簿）, StoreBuilder, StoreConfig
//! - **typed**: serde 型付き action API
//! - **impls**: ports の実装（TracingObserver など）
//!
//! # 使用例
//! ```ignore
//! let store = Store::new();
//! let counter = store.create_scope(Some("counter"), json!(0), Vec::new())?;
//! let add = counter.register_action("add", from_fn(|state, props, settle| {
//!     settle.resolve(state.as_i64().unwrap_or(0) + props.as_i64().unwrap_or(0));
//! }))?;
//! add.dispatch(json!(5)).await?;
//! ```
//!
//! Dispatching spawns onto the ambient tokio runtime, so `dispatch` must be
//! called from within one.

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod scope;
pub mod typed;

pub use app::{BuildError, IdStrategy, ScopeRef, Store, StoreBuilder, StoreConfig};
pub use domain::{ActionRejection, ErrorKind, Frozen, Props, ScopeEvent, State, StoreError};
pub use ports::{Middleware, StoreObserver};
pub use scope::{
    Action, ActionDispatcher, DispatchHandle, Scope, Settle, SharedAction, SyncTarget, from_async,
    from_fn,
};
