//! App - scope を束ねる store 層
//!
//! # 主要コンポーネント
//! - **Store**: 名前 → scope の登録簿（default scope 付き）
//! - **StoreBuilder**: 設定・observer・id 生成器のワイヤリング
//! - **StoreConfig**: serde で読める設定

pub mod builder;
pub mod config;
pub mod store;

pub use self::builder::{BuildError, StoreBuilder};
pub use self::config::{IdStrategy, StoreConfig};
pub use self::store::{ScopeRef, Store};
