/*
 * Responsibility
 * - middleware の公開インターフェース
 * - auth::access (認証), auth::scope (scope 認可), http (横断的な HTTP layer)
 */
pub mod auth;
pub mod http;
