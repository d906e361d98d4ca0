//! StoreConfig - store の設定
//!
//! Every field has a default, so an empty JSON object is a valid config.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Which id generator a store builds when none is injected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    /// `{prefix}-{ulid}`
    #[default]
    Ulid,
    /// `{prefix}{n}`, n counting from 1 per prefix
    Sequential,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Name of the default scope every store starts with.
    pub root_scope: String,
    /// Initial state of the default scope.
    pub root_state: Value,
    /// Prefix for generated scope names.
    pub scope_prefix: String,
    /// Prefix for listener ids.
    pub listener_prefix: String,
    pub ids: IdStrategy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root_scope: "rootScope".to_string(),
            root_state: Value::Object(Map::new()),
            scope_prefix: "scope".to_string(),
            listener_prefix: "listener".to_string(),
            ids: IdStrategy::Ulid,
        }
    }
}

impl StoreConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_document_gives_defaults() {
        let config = StoreConfig::from_json("{}").unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.root_scope, "rootScope");
        assert_eq!(config.root_state, json!({}));
    }

    #[test]
    fn partial_document_overrides_fields() {
        let config =
            StoreConfig::from_json(r#"{ "root_scope": "app", "ids": "sequential" }"#).unwrap();
        assert_eq!(config.root_scope, "app");
        assert_eq!(config.ids, IdStrategy::Sequential);
        assert_eq!(config.listener_prefix, "listener");
    }

    #[test]
    fn unknown_strategy_is_an_error() {
        assert!(StoreConfig::from_json(r#"{ "ids": "uuid" }"#).is_err());
    }
}
