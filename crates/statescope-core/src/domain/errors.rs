//! Errors - 構造的なエラーと分類
//!
//! Structural errors are returned synchronously by the call that caused
//! them and never leave a state change behind. Action failures are not
//! here: they travel through `ActionRejection`.

/// ErrorKind は構造的エラーの分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Registration,
    DispatchNotFound,
    Subscription,
    Synchronization,
    Composition,
    NotFound,
}

/// StoreError は store / scope の構造的エラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("scope `{scope}` is locked, action `{action}` can not be registered")]
    ScopeLocked { scope: String, action: String },

    #[error("action `{action}` is already registered in scope `{scope}`")]
    DuplicateAction { scope: String, action: String },

    #[error("action name `{action}` is reserved in scope `{scope}`")]
    ReservedActionName { scope: String, action: String },

    #[error("action `{action}` does not exist in scope `{scope}`")]
    ActionNotFound { scope: String, action: String },

    #[error("can not subscribe to action `{action}`: not present in scope `{scope}`")]
    UnknownSubscription { scope: String, action: String },

    #[error("scope `{scope}` state is not a record; a key is required to synchronize")]
    StateNotRecord { scope: String },

    #[error("composite scope `{scope}` needs at least two distinct children, got {count}")]
    TooFewChildren { scope: String, count: usize },

    #[error("composite scope `{scope}` was locked by middleware before its setup completed")]
    LockedDuringSetup { scope: String },

    #[error("scope `{0}` not present")]
    ScopeNotFound(String),

    #[error("scope name `{0}` is already taken")]
    DuplicateScope(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::ScopeLocked { .. }
            | StoreError::DuplicateAction { .. }
            | StoreError::ReservedActionName { .. }
            | StoreError::DuplicateScope(_) => ErrorKind::Registration,
            StoreError::ActionNotFound { .. } => ErrorKind::DispatchNotFound,
            StoreError::UnknownSubscription { .. } => ErrorKind::Subscription,
            StoreError::StateNotRecord { .. } => ErrorKind::Synchronization,
            StoreError::TooFewChildren { .. } | StoreError::LockedDuringSetup { .. } => {
                ErrorKind::Composition
            }
            StoreError::ScopeNotFound(_) => ErrorKind::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(StoreError::ScopeLocked { scope: "s".into(), action: "a".into() }, ErrorKind::Registration)]
    #[case(StoreError::ReservedActionName { scope: "s".into(), action: "lock".into() }, ErrorKind::Registration)]
    #[case(StoreError::ActionNotFound { scope: "s".into(), action: "a".into() }, ErrorKind::DispatchNotFound)]
    #[case(StoreError::UnknownSubscription { scope: "s".into(), action: "a".into() }, ErrorKind::Subscription)]
    #[case(StoreError::StateNotRecord { scope: "s".into() }, ErrorKind::Synchronization)]
    #[case(StoreError::TooFewChildren { scope: "c".into(), count: 1 }, ErrorKind::Composition)]
    #[case(StoreError::ScopeNotFound("s".into()), ErrorKind::NotFound)]
    fn errors_are_classified(#[case] err: StoreError, #[case] kind: ErrorKind) {
        assert_eq!(err.kind(), kind);
    }
}
