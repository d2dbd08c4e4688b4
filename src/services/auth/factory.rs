/// Factory: build auth services from application `Config`.
use std::sync::Arc;

use crate::config::Config;
use crate::error::AppError;
use crate::services::auth::AuthService;
use crate::services::auth::scope_guard::ScopeGuard;

pub fn build_auth_service(config: &Config) -> Result<Arc<AuthService>, AppError> {
    let auth = AuthService::new(
        &config.access_jwt_public_key_pem,
        &config.auth_issuer,
        &config.auth_audience,
        config.access_token_leeway_seconds,
    )?;

    Ok(Arc::new(auth))
}

pub fn build_scope_guard(config: &Config) -> ScopeGuard {
    let settings = config.scope_guard.clone();
    ScopeGuard::new(settings.allow_scopes, settings.guard)
}
