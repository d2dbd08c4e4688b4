/*!
 * Scope guard
 *
 * Responsibility:
 * - 設定 (required scopes / GuardConfig) を構築時に一度だけ解決する
 * - リクエスト毎に principal の scope と突き合わせて Outcome を返す
 * - axum 依存の配線は middleware::auth::scope に置く
 *
 * Public API:
 * - ScopeGuard
 * - AllowScopes / GuardConfig / GuardError
 * - ScopeSource / ScopeValue
 * - Outcome / Challenge / ScopeError / DenialSink
 */

mod core;
mod types;

pub use self::core::ScopeGuard;
pub use self::types::{
    AllowScopes, Challenge, DEFAULT_SCOPE_KEY, DenialSink, GuardConfig, GuardError,
    INSUFFICIENT_SCOPE, Outcome, ScopeError, ScopeSource, ScopeValue, split_scopes,
};
