//! access token（JWT）検証 → AuthCtx を extensions に入れる
//!
//! - `Authorization: Bearer <jwt>` を AuthService で検証する (署名 / iss / aud / exp)
//! - 検証済み claims から AuthCtx を作り、後段 (scope guard / handler) に渡す
//! - ヘッダ欠落・検証失敗はすべて 401

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::{self, Next},
    response::Response,
};
use chrono::DateTime;
use tracing::Instrument;

use crate::api::v1::extractors::AuthCtx;
use crate::error::AppError;
use crate::services::auth::access_jwt::VerifiedAccessToken;
use crate::state::AppState;

/// `/api/v1/*` に認証を掛けるための middleware を適用する。
///
/// scope guard より外側 (= 先に実行される側) に置くこと。
/// ```ignore
/// let v1 = middleware::auth::scope::apply::<AuthCtx, _>(v1, state.guard.clone());
/// let v1 = middleware::auth::access::apply(v1, state.clone());
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8 の from_fn は State extractor を受け取れないため、`from_fn_with_state` で明示的に state を渡す
    router.layer(middleware::from_fn_with_state(state, access_middleware))
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = auth.strip_prefix("Bearer ").ok_or(AppError::Unauthorized)?;

    let verified = match state.auth.verify(token) {
        Ok(verified) => verified,
        Err(err) => {
            tracing::warn!(
                error = ?err,
                "access token verification failed"
            );
            return Err(AppError::Unauthorized);
        }
    };

    let ctx = auth_ctx(verified);

    // 後段 (scope guard の拒否ログなど) は jti 付きの span の中で動く
    let span = tracing::info_span!(
        "access",
        user_id = %ctx.user_id,
        jti = ctx.jti.as_deref().unwrap_or("-"),
    );
    tracing::debug!(parent: &span, "access token verified");

    // middleware → extractor / scope guard への受け渡し
    req.extensions_mut().insert(ctx);

    Ok(next.run(req).instrument(span).await)
}

fn auth_ctx(verified: VerifiedAccessToken) -> AuthCtx {
    let mut ctx = AuthCtx::new(verified.user_id);
    ctx.claims = verified.claims;
    ctx.jti = verified.jti;
    ctx.expires_at = i64::try_from(verified.exp)
        .ok()
        .and_then(|exp| DateTime::from_timestamp(exp, 0));
    ctx
}
