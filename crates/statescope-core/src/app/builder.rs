//! StoreBuilder - store の構築とワイヤリング
//!
//! # Fail-fast 設計
//! - build() 時に設定を検証し、壊れた設定では store を作らない
//! - observer は build 前に渡せば default scope の作成も観測できる

use std::sync::Arc;

use super::config::{IdStrategy, StoreConfig};
use super::store::Store;
use crate::ports::{IdGenerator, SequentialIdGenerator, StoreObserver, SystemClock, UlidGenerator};

/// StoreBuilder は Store を構築
///
/// # 使用例
/// ```ignore
/// let store = StoreBuilder::new()
///     .config(StoreConfig::from_json(text)?)
///     .observer(Arc::new(TracingObserver))
///     .build()?;
/// ```
#[derive(Default)]
pub struct StoreBuilder {
    config: StoreConfig,
    observer: Option<Arc<dyn StoreObserver>>,
    ids: Option<Arc<dyn IdGenerator>>,
}

/// BuildError は store 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("root scope name must not be empty")]
    EmptyRootScope,

    #[error("{0} must not be empty")]
    EmptyPrefix(&'static str),
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn StoreObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Use this generator instead of the one `config.ids` selects.
    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// # 検証
    /// - root scope 名が空でないこと
    /// - scope / listener の prefix が空でないこと
    pub fn build(self) -> Result<Store, BuildError> {
        if self.config.root_scope.is_empty() {
            return Err(BuildError::EmptyRootScope);
        }
        if self.config.scope_prefix.is_empty() {
            return Err(BuildError::EmptyPrefix("scope_prefix"));
        }
        if self.config.listener_prefix.is_empty() {
            return Err(BuildError::EmptyPrefix("listener_prefix"));
        }

        let ids: Arc<dyn IdGenerator> = match self.ids {
            Some(ids) => ids,
            None => match self.config.ids {
                IdStrategy::Ulid => Arc::new(UlidGenerator::new(SystemClock)),
                IdStrategy::Sequential => Arc::new(SequentialIdGenerator::new()),
            },
        };
        Ok(Store::assemble(self.config, self.observer, ids))
    }
}
