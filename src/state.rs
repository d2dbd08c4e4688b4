/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - auth: access token の検証, guard: /api/v1 に掛ける scope guard
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::services::auth::{AuthService, scope_guard::ScopeGuard};

#[derive(Clone, Debug)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub guard: ScopeGuard,
}

impl AppState {
    pub fn new(auth: Arc<AuthService>, guard: ScopeGuard) -> Self {
        Self { auth, guard }
    }
}
