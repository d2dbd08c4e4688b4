/*
 * Responsibility
 * - GET /me の response DTO
 */
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::api::v1::extractors::AuthCtx;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: Uuid,
    pub scopes: Vec<String>,
    pub roles: Vec<String>,
    pub jti: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&AuthCtx> for MeResponse {
    fn from(ctx: &AuthCtx) -> Self {
        Self {
            user_id: ctx.user_id,
            scopes: ctx.scopes().into_iter().map(str::to_owned).collect(),
            roles: ctx.roles().into_iter().map(str::to_owned).collect(),
            jti: ctx.jti.clone(),
            expires_at: ctx.expires_at,
        }
    }
}
