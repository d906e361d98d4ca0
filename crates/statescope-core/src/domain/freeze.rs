//! Frozen - 共有された不変値
//!
//! Published state and dispatched props are handed out as `Frozen<T>`.
//! Once a value is frozen nobody can reach it mutably again, so listeners,
//! middleware and concurrent readers can share it without coordination.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Frozen は値とそこから辿れる全てを不変にしたハンドル
///
/// # 性質
/// - `Clone` はポインタのコピーだけ（中身は共有）
/// - 再 freeze は no-op（`Frozen<T>` から `Frozen<T>` への変換は恒等）
/// - 中身は `Deref` で読むだけ。`&mut T` を取り出す API は存在しない
pub struct Frozen<T>(Arc<T>);

impl<T> Frozen<T> {
    pub fn new(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn value(&self) -> &T {
        &self.0
    }

    /// Two handles pointing at the very same frozen value.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.0, &other.0)
    }
}

impl<T: Clone> Frozen<T> {
    /// Take an owned, thawed copy. The frozen original is untouched.
    pub fn thaw(&self) -> T {
        T::clone(&self.0)
    }
}

impl<T> Clone for Frozen<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Deref for Frozen<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> From<T> for Frozen<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Frozen<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        T::fmt(&self.0, f)
    }
}

impl<T: fmt::Display> fmt::Display for Frozen<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        T::fmt(&self.0, f)
    }
}

impl<T: PartialEq> PartialEq for Frozen<T> {
    fn eq(&self, other: &Self) -> bool {
        Frozen::ptr_eq(self, other) || *self.0 == *other.0
    }
}

impl<T: Eq> Eq for Frozen<T> {}

impl PartialEq<Value> for Frozen<Value> {
    fn eq(&self, other: &Value) -> bool {
        *self.0 == *other
    }
}

impl<T: Serialize> Serialize for Frozen<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        T::serialize(&self.0, serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Frozen<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Frozen::new)
    }
}

/// Scope state as published to readers.
pub type State = Frozen<Value>;

/// Props as seen by middleware and actions.
pub type Props = Frozen<Value>;
