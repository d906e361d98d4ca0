//! IdGenerator port - 一意な名前の生成
//!
//! Scope names without an explicit name and every listener id come from
//! here. The only contract is: never hand out the same string twice for
//! the same prefix.
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（デフォルト）
//! - **SequentialIdGenerator**: prefix ごとの連番（テスト・デモ用）

use std::collections::HashMap;

use parking_lot::Mutex;
use ulid::Ulid;

use crate::ports::Clock;

/// IdGenerator は prefix 付きの一意な文字列を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（store と全 scope で共有される）
pub trait IdGenerator: Send + Sync {
    fn unique_id(&self, prefix: &str) -> String;
}

/// UlidGenerator は `{prefix}-{ulid}` を生成
///
/// Clock を使って現在時刻ベースの ULID を作るので、FixedClock を渡せば
/// timestamp 部分は決定的になる（ランダム部分は毎回異なる）。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn unique_id(&self, prefix: &str) -> String {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        format!("{prefix}-{ulid}")
    }
}

/// SequentialIdGenerator は `{prefix}{n}` を生成（n は 1 始まり）
#[derive(Default)]
pub struct SequentialIdGenerator {
    counters: Mutex<HashMap<String, u64>>,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn unique_id(&self, prefix: &str) -> String {
        let mut counters = self.counters.lock();
        let next = counters.entry(prefix.to_string()).or_insert(0);
        *next += 1;
        format!("{prefix}{next}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn ulid_generator_generates_unique_ids() {
        let id_gen = UlidGenerator::new(SystemClock);

        let id1 = id_gen.unique_id("listener");
        let id2 = id_gen.unique_id("listener");
        let id3 = id_gen.unique_id("listener");

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
        assert!(id1.starts_with("listener-"));
    }

    #[test]
    fn ulid_generator_with_fixed_clock_shares_timestamp() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let id1 = id_gen.unique_id("scope");
        let id2 = id_gen.unique_id("scope");
        assert_ne!(id1, id2);

        let ulid1 = Ulid::from_string(id1.trim_start_matches("scope-")).unwrap();
        let ulid2 = Ulid::from_string(id2.trim_start_matches("scope-")).unwrap();
        assert_eq!(ulid1.timestamp_ms(), ulid2.timestamp_ms());
        assert_eq!(ulid1.timestamp_ms(), fixed_time.timestamp_millis() as u64);
    }

    #[test]
    fn sequential_generator_counts_per_prefix() {
        let id_gen = SequentialIdGenerator::new();
        assert_eq!(id_gen.unique_id("scope"), "scope1");
        assert_eq!(id_gen.unique_id("scope"), "scope2");
        assert_eq!(id_gen.unique_id("listener"), "listener1");
    }
}
