//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **TracingObserver**: observer イベントを tracing に出す
//! - **RecordingObserver**: テスト用（`cfg(test)` のみ）

pub mod tracing_observer;

#[cfg(test)]
mod recording;

pub use self::tracing_observer::TracingObserver;

#[cfg(test)]
pub(crate) use self::recording::RecordingObserver;
