/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - access / scope middleware の適用は app.rs 側で行う (ここは route 定義のみ)
 */
use axum::{Router, routing::get};

use crate::api::v1::handlers::me::me;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/me", get(me))
}
