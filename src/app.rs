/*
 * Responsibility
 * - tracing / panic hook 初期化
 * - Config読み込み → 依存生成 (AuthService / ScopeGuard) → Router 組み立て
 * - Middleware の適用 (access → scope → handler, 外側に http layer)
 * - axum::serve() で起動
 */
use std::{panic, process};

use anyhow::Result;
use axum::{Router, routing::get};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::{self, v1::extractors::AuthCtx, v1::handlers::health::health};
use crate::config::Config;
use crate::error::AppError;
use crate::middleware::{self, http::HttpLimits};
use crate::services::auth::{build_auth_service, build_scope_guard};
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,scope_guard=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // stderr が見えない起動方法でも panic を落とさないよう tracing に出す
        tracing::error!(?info, "panic");

        // development は即死させて気付けるようにする
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env().map_err(AppError::from)?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting API in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config)?;
    let app = build_router(state, config.http_limits);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_state(config: &Config) -> Result<AppState, AppError> {
    let auth = build_auth_service(config)?;
    let guard = build_scope_guard(config);

    tracing::info!(
        required = ?guard.required_scopes(),
        scope_key = guard.scope_key(),
        require_all = guard.require_all(),
        sink = ?guard.denial_sink(),
        "scope guard ready"
    );

    Ok(AppState::new(auth, guard))
}

/// `/health` is public; `/api/v1/*` requires a valid access token and passes the scope guard.
pub fn build_router(state: AppState, limits: HttpLimits) -> Router {
    let v1 = api::v1::routes();
    // layer は後から積んだものが外側になる: access → scope → handler の順で実行される
    let v1 = middleware::auth::scope::apply::<AuthCtx, _>(v1, state.guard.clone());
    let v1 = middleware::auth::access::apply(v1, state.clone());

    let router = Router::new()
        .route("/health", get(health))
        .nest("/api/v1", v1)
        .with_state(state);

    middleware::http::apply(router, limits)
}
