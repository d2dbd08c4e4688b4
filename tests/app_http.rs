//! Full application Router: access token middleware + scope guard + handlers.

mod common;

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use common::{AUDIENCE, ISSUER, PRIVATE_KEY_PEM, PUBLIC_KEY_PEM, body_json, body_string, get};
use scope_guard::app::build_router;
use scope_guard::middleware::http::HttpLimits;
use scope_guard::services::auth::AuthService;
use scope_guard::state::AppState;
use scope_guard::{GuardConfig, ScopeGuard};

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    aud: &'a str,
    sub: String,
    exp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    jti: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    roles: Option<Vec<&'a str>>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl<'a> Claims<'a> {
    fn new(sub: Uuid) -> Self {
        Self {
            iss: ISSUER,
            aud: AUDIENCE,
            sub: sub.to_string(),
            exp: (chrono::Utc::now().timestamp() + 600) as u64,
            jti: None,
            scope: None,
            roles: None,
            extra: Map::new(),
        }
    }

    fn sign(&self) -> String {
        let key = EncodingKey::from_ed_pem(PRIVATE_KEY_PEM.as_bytes()).unwrap();
        jsonwebtoken::encode(&Header::new(Algorithm::EdDSA), self, &key).unwrap()
    }
}

fn app(guard: ScopeGuard) -> Router {
    let auth = AuthService::new(PUBLIC_KEY_PEM, ISSUER, AUDIENCE, 0).unwrap();
    build_router(AppState::new(Arc::new(auth), guard), HttpLimits::default())
}

fn me(token: &str) -> Request<Body> {
    Request::builder()
        .uri("/api/v1/me")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let app = app(ScopeGuard::new("admin", GuardConfig::default()));

    let res = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(body_json(res).await, json!({"status": "ok"}));
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let app = app(ScopeGuard::new("read", GuardConfig::default()));

    let res = app.oneshot(get("/api/v1/me")).await.unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().get(header::WWW_AUTHENTICATE).is_none());
    assert_eq!(
        body_json(res).await,
        json!({"error": {"code": "UNAUTHORIZED", "message": "unauthorized"}})
    );
}

#[tokio::test]
async fn malformed_token_is_unauthorized() {
    let app = app(ScopeGuard::new("read", GuardConfig::default()));

    let res = app.oneshot(me("not-a-jwt")).await.unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_audience_is_unauthorized() {
    let app = app(ScopeGuard::new(Vec::<String>::new(), GuardConfig::default()));
    let mut claims = Claims::new(Uuid::new_v4());
    claims.aud = "someone-else";

    let res = app.oneshot(me(&claims.sign())).await.unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn granted_scope_reaches_handler() {
    let app = app(ScopeGuard::new("read write", GuardConfig::default()));
    let user_id = Uuid::new_v4();
    let mut claims = Claims::new(user_id);
    claims.scope = Some(json!("read profile"));

    let res = app.oneshot(me(&claims.sign())).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["user_id"], json!(user_id));
    assert_eq!(body["scopes"], json!(["read", "profile"]));
    assert!(body["expires_at"].is_string());
}

#[tokio::test]
async fn insufficient_scope_is_forbidden() {
    let app = app(ScopeGuard::new(
        "read write",
        GuardConfig::default().with_require_all(true),
    ));
    let mut claims = Claims::new(Uuid::new_v4());
    claims.scope = Some(json!("read"));

    let res = app.oneshot(me(&claims.sign())).await.unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        res.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        r#"Bearer scope="read write", error="Insufficient scope""#
    );
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(body_string(res).await, "Insufficient scope");
}

#[tokio::test]
async fn token_without_scope_claim_is_forbidden() {
    let app = app(ScopeGuard::new("read", GuardConfig::default()));
    let claims = Claims::new(Uuid::new_v4());

    let res = app.oneshot(me(&claims.sign())).await.unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn roles_can_back_the_guard() {
    let app = app(ScopeGuard::new(
        ["admin"],
        GuardConfig::default()
            .with_scope_key("roles")
            .with_error_to_next(true),
    ));

    let mut claims = Claims::new(Uuid::new_v4());
    claims.roles = Some(vec!["admin", "ops"]);
    let res = app.clone().oneshot(me(&claims.sign())).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    claims.roles = Some(vec!["ops"]);
    let res = app.oneshot(me(&claims.sign())).await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(res).await,
        json!({"statusCode": 403, "error": "Forbidden", "message": "Insufficient scope"})
    );
}

#[tokio::test]
async fn array_scope_claim_is_accepted() {
    let app = app(ScopeGuard::new("read", GuardConfig::default()));
    let mut claims = Claims::new(Uuid::new_v4());
    claims.scope = Some(json!(["read"]));

    let res = app.clone().oneshot(me(&claims.sign())).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["scopes"], json!(["read"]));

    claims.scope = Some(json!(["write", "profile"]));
    let res = app.oneshot(me(&claims.sign())).await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        res.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        r#"Bearer scope="read", error="Insufficient scope""#
    );
}

#[tokio::test]
async fn custom_scope_key_reads_that_claim() {
    let app = app(ScopeGuard::new(
        "orders:read",
        GuardConfig::default().with_scope_key("scp"),
    ));

    let mut claims = Claims::new(Uuid::new_v4());
    claims.extra.insert("scp".into(), json!("orders:read orders:write"));
    let res = app.clone().oneshot(me(&claims.sign())).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let mut claims = Claims::new(Uuid::new_v4());
    claims.extra.insert("scp".into(), json!(["orders:read"]));
    let res = app.clone().oneshot(me(&claims.sign())).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // scope key は "scp" なので "scope" claim は見ない
    let mut claims = Claims::new(Uuid::new_v4());
    claims.scope = Some(json!("orders:read"));
    let res = app.oneshot(me(&claims.sign())).await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn jti_is_carried_to_the_handler() {
    let app = app(ScopeGuard::new(Vec::<String>::new(), GuardConfig::default()));
    let mut claims = Claims::new(Uuid::new_v4());
    claims.jti = Some("at-0001");
    claims.roles = Some(vec!["ops"]);

    let res = app.oneshot(me(&claims.sign())).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["jti"], json!("at-0001"));
    assert_eq!(body["roles"], json!(["ops"]));
    assert_eq!(body["scopes"], json!([]));
}
