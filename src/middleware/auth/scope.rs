//! Scope-based authorization middleware.
//!
//! Reads the principal (`P`) that an upstream authentication layer stored in the
//! request extensions and runs it through a [`ScopeGuard`].
//!
//! - `Outcome::Proceed`  -> the request continues to the inner service
//! - `Outcome::Respond`  -> 403 + `WWW-Authenticate` challenge, inner service is not called
//! - `Outcome::Forward`  -> the [`ScopeError`] is handed to the error path
//!   (its `IntoResponse` impl); the guard itself writes nothing
//!
//! [`ScopeError`]: crate::services::auth::scope_guard::ScopeError

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::{IntoResponse, Response},
};

use crate::services::auth::scope_guard::{Outcome, ScopeGuard, ScopeSource};

/// Guard every route of `router` with `guard`.
///
/// `P` is the principal type the authentication layer inserts into the request
/// extensions (e.g. `AuthCtx`). A request without a `P` is treated as having no principal.
///
/// ```ignore
/// let guard = ScopeGuard::new("read write", GuardConfig::default());
/// let v1 = middleware::auth::scope::apply::<AuthCtx, _>(v1, guard);
/// ```
pub fn apply<P, S>(router: Router<S>, guard: ScopeGuard) -> Router<S>
where
    P: ScopeSource + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(guard, scope_middleware::<P>))
}

async fn scope_middleware<P>(
    State(guard): State<ScopeGuard>,
    req: Request<Body>,
    next: Next,
) -> Response
where
    P: ScopeSource + Send + Sync + 'static,
{
    // GrantedScopes はリクエスト毎に作り直す (guard 側には何も残さない)
    let outcome = guard.evaluate(req.extensions().get::<P>());

    match outcome {
        Outcome::Proceed => next.run(req).await,
        Outcome::Forward(err) => err.into_response(),
        Outcome::Respond(challenge) => challenge.into_response(),
    }
}
