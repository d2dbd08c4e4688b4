/*
 * Responsibility
 * - access: Bearer トークンの検証 → AuthCtx を request extensions に載せる (認証)
 * - scope: AuthCtx などの principal の scope を ScopeGuard で判定する (認可)
 */
pub mod access;
pub mod scope;
