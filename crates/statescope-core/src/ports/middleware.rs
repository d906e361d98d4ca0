//! Middleware port - action の前後に割り込む
//!
//! # 順序
//! Middleware is supplied outermost-first. The scope stores the list
//! reversed and folds it over the raw action on every execution, so the
//! last supplied middleware ends up innermost.

use crate::scope::{Scope, SharedAction};

/// Middleware は action を包む interceptor
///
/// # フック
/// - `pre_setup`: scope の構築中（action がまだ 1 つもない時点）
/// - `post_setup`: store への登録直後。ここで action を足したり subscribe したりできる。
///   ここで lock するのは推奨しない
/// - `wrap`: dispatch のたびに呼ばれ、包んだ action を返す（キャッシュしない）
pub trait Middleware: Send + Sync {
    fn pre_setup(&self, _scope: &Scope) {}

    fn post_setup(&self, _scope: &Scope) {}

    fn wrap(&self, action: SharedAction) -> SharedAction {
        action
    }
}
