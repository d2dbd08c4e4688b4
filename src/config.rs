/*
 * Responsibility
 * - 環境変数や設定の読み込み (PORT, Auth 設定, scope guard 設定)
 * - 設定値のバリデーション (不足・不正なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::middleware::http::HttpLimits;
use crate::services::auth::scope_guard::{AllowScopes, GuardConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<String>) -> Self {
        match raw
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Scope guard section of the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeGuardSettings {
    pub allow_scopes: AllowScopes,
    pub guard: GuardConfig,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub http_limits: HttpLimits,

    pub auth_issuer: String,
    pub auth_audience: String,
    pub access_token_leeway_seconds: u64,
    pub access_jwt_public_key_pem: String,

    pub scope_guard: ScopeGuardSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup (env, map in tests, ...).
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = var("PORT").and_then(|s| s.parse().ok()).unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(var("APP_ENV"));

        let defaults = HttpLimits::default();
        let http_limits = HttpLimits {
            body_limit_bytes: var("HTTP_BODY_LIMIT_BYTES")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(defaults.body_limit_bytes),
            timeout: var("HTTP_TIMEOUT_SECONDS")
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        };

        let auth_issuer = var("AUTH_ISSUER").ok_or(ConfigError::Missing("AUTH_ISSUER"))?;
        let auth_audience = var("AUTH_AUDIENCE").ok_or(ConfigError::Missing("AUTH_AUDIENCE"))?;

        let access_token_leeway_seconds = var("ACCESS_TOKEN_LEEWAY_SECONDS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60);

        let access_jwt_public_key_pem = var("ACCESS_JWT_PUBLIC_KEY_PEM")
            .ok_or(ConfigError::Missing("ACCESS_JWT_PUBLIC_KEY_PEM"))?
            .replace("\\n", "\n");

        let scope_guard = scope_guard_from_vars(&var)?;

        Ok(Self {
            addr,
            app_env,
            http_limits,
            auth_issuer,
            auth_audience,
            access_token_leeway_seconds,
            access_jwt_public_key_pem,
            scope_guard,
        })
    }
}

fn scope_guard_from_vars<F>(var: &F) -> Result<ScopeGuardSettings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    // JSON 形式 (string or array) が指定されていればそちらを優先する
    let allow_scopes = match var("SCOPE_GUARD_ALLOW_SCOPES_JSON") {
        Some(raw) => serde_json::from_str::<serde_json::Value>(&raw)
            .ok()
            .and_then(|value| AllowScopes::try_from(value).ok())
            .ok_or(ConfigError::Invalid("SCOPE_GUARD_ALLOW_SCOPES_JSON"))?,
        // 未設定は「制限なし」。空文字列を明示した場合は空 scope 1 件として扱う
        None => match var("SCOPE_GUARD_ALLOW_SCOPES") {
            Some(raw) => AllowScopes::Spaced(raw),
            None => AllowScopes::List(Vec::new()),
        },
    };

    let mut guard = GuardConfig::default();
    if let Some(scope_key) = var("SCOPE_GUARD_SCOPE_KEY") {
        guard = guard.with_scope_key(scope_key);
    }
    if let Some(raw) = var("SCOPE_GUARD_REQUIRE_ALL") {
        guard = guard.with_require_all(
            parse_bool(&raw).ok_or(ConfigError::Invalid("SCOPE_GUARD_REQUIRE_ALL"))?,
        );
    }
    if let Some(raw) = var("SCOPE_GUARD_ERROR_TO_NEXT") {
        guard = guard.with_error_to_next(
            parse_bool(&raw).ok_or(ConfigError::Invalid("SCOPE_GUARD_ERROR_TO_NEXT"))?,
        );
    }

    Ok(ScopeGuardSettings {
        allow_scopes,
        guard,
    })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
