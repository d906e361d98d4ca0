//! Events - dispatch の結果として外に出る値
//!
//! `ScopeEvent` は成功した dispatch ごとに listener と observer へ渡され、
//! `ActionRejection` は reject された dispatch の結果として返される。

use serde::Serialize;
use serde_json::Value;

use super::freeze::{Props, State};

/// A committed state change.
///
/// `old_state` is the state captured when the dispatch started executing,
/// `new_state` is what the action resolved with (already frozen and
/// published by the time anyone sees this event).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeEvent {
    pub old_state: State,
    pub new_state: State,
    pub scope_name: String,
    pub action_name: String,
    pub props: Props,
}

/// ActionRejection は action 自身が reject したときの結果
///
/// The scope state is never changed by a rejected dispatch; `old_state` is
/// still the current state unless a later dispatch has already run.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("action `{action_name}` rejected in scope `{scope_name}`: {reason}")]
pub struct ActionRejection {
    pub reason: Value,
    pub old_state: State,
    pub scope_name: String,
    pub action_name: String,
    pub props: Props,
}

impl ActionRejection {
    /// Render this rejection as a plain JSON value, used when a composite
    /// forwards a child's failure as its own rejection reason.
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "reason": self.reason,
            "oldState": self.old_state.value(),
            "scopeName": self.scope_name,
            "actionName": self.action_name,
            "props": self.props.value(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Frozen;
    use serde_json::json;

    #[test]
    fn rejection_message_names_scope_and_action() {
        let rejection = ActionRejection {
            reason: json!("boom"),
            old_state: Frozen::new(json!(1)),
            scope_name: "counter".to_string(),
            action_name: "add".to_string(),
            props: Frozen::new(json!(2)),
        };
        let msg = rejection.to_string();
        assert!(msg.contains("`add`"));
        assert!(msg.contains("`counter`"));
        assert_eq!(rejection.to_value()["oldState"], json!(1));
    }
}
