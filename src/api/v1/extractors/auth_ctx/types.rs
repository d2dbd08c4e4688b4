/*
 * Responsibility
 * - Handler から見える「認証済みコンテキスト」の型
 * - access middleware が検証して request extensions に格納し、handler / scope guard はこの型だけを見る
 *
 * Notes
 * - JWT の検証ロジックは middleware/services 側の責務
 * - scope guard からは ScopeSource として参照される (key は任意の claim 名)
 */
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::services::auth::scope_guard::{DEFAULT_SCOPE_KEY, ScopeSource, ScopeValue};

const ROLES_KEY: &str = "roles";

/// 認証済みのリクエストに付与されるコンテキスト
///
/// - `user_id` は内部ユーザーID（UUID）
/// - `claims` は access token の残りの claim (object)。`scope` は string / array どちらもあり得る
/// - `jti` は監査/相関用
#[derive(Debug, Clone)]
pub struct AuthCtx {
    pub user_id: Uuid,
    pub jti: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub claims: Value,
}

impl AuthCtx {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            jti: None,
            expires_at: None,
            claims: Value::Object(Map::new()),
        }
    }

    pub fn with_claim(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Value::Object(claims) = &mut self.claims {
            claims.insert(key.into(), value.into());
        }
        self
    }

    /// `scope` claim の中身 (space 区切り string / array のどちらでも)
    pub fn scopes(&self) -> Vec<&str> {
        self.claim_values(DEFAULT_SCOPE_KEY)
    }

    pub fn roles(&self) -> Vec<&str> {
        self.claim_values(ROLES_KEY)
    }

    fn claim_values(&self, key: &str) -> Vec<&str> {
        self.claims
            .scope_value(key)
            .map(ScopeValue::into_scopes)
            .unwrap_or_default()
    }
}

impl ScopeSource for AuthCtx {
    fn scope_value(&self, key: &str) -> Option<ScopeValue<'_>> {
        self.claims.scope_value(key)
    }
}
