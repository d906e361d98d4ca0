//! Typed - serde 型付き action API
//!
//! # 二層構造
//! - **表層（Typed）**: `register_typed`, `TypedSettle<S>` - 型安全
//! - **内部（Dyn）**: `Action` trait - `serde_json::Value` ベースで object-safe

pub mod action;

pub use self::action::{TypedAction, TypedSettle, register_typed, state_as, typed};
