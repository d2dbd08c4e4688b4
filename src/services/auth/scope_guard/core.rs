//! Scope guard decision logic.
//!
//! This module is "core-only": it knows nothing about request extensions or
//! the middleware stack. The axum adapter lives in `middleware::auth::scope`
//! and only maps an [`Outcome`] onto the pipeline.

use std::collections::HashSet;
use std::sync::Arc;

use super::types::{
    AllowScopes, Challenge, DenialSink, GuardConfig, GuardError, Outcome, ScopeError, ScopeSource,
};

/// Why a request was denied. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DenyReason {
    NoPrincipal,
    NoScopeClaim,
    InsufficientScope,
}

impl DenyReason {
    fn as_str(self) -> &'static str {
        match self {
            DenyReason::NoPrincipal => "no principal on request",
            DenyReason::NoScopeClaim => "principal exposes no scopes at scope key",
            DenyReason::InsufficientScope => "granted scopes do not satisfy required scopes",
        }
    }
}

struct GuardInner {
    required: Vec<String>,
    scope_key: String,
    require_all: bool,
    sink: DenialSink,
    challenge: Challenge,
}

/// Scope-based authorization guard.
///
/// Required scopes and options are fixed at construction; each request is
/// evaluated from scratch. Cloning is cheap (shared `Arc`).
#[derive(Clone)]
pub struct ScopeGuard {
    inner: Arc<GuardInner>,
}

impl std::fmt::Debug for ScopeGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeGuard")
            .field("required", &self.inner.required)
            .field("scope_key", &self.inner.scope_key)
            .field("require_all", &self.inner.require_all)
            .field("sink", &self.inner.sink)
            .finish()
    }
}

impl ScopeGuard {
    pub fn new(allow_scopes: impl Into<AllowScopes>, config: GuardConfig) -> Self {
        let required = allow_scopes.into().into_scopes();
        let sink = DenialSink::from_config(&config);
        let challenge = Challenge::new(&required);
        let scope_key = config.resolved_scope_key().to_owned();

        tracing::debug!(
            required = ?required,
            scope_key = %scope_key,
            require_all = config.require_all,
            sink = ?sink,
            "scope guard configured"
        );

        Self {
            inner: Arc::new(GuardInner {
                required,
                scope_key,
                require_all: config.require_all,
                sink,
                challenge,
            }),
        }
    }

    /// Build a guard from dynamically-typed scopes (e.g. a JSON config file).
    ///
    /// Fails with [`GuardError::InvalidArgument`] unless `allow_scopes` is a string
    /// or an array of strings.
    pub fn from_json(
        allow_scopes: serde_json::Value,
        config: GuardConfig,
    ) -> Result<Self, GuardError> {
        let allow_scopes = AllowScopes::try_from(allow_scopes)?;
        Ok(Self::new(allow_scopes, config))
    }

    pub fn required_scopes(&self) -> &[String] {
        &self.inner.required
    }

    pub fn scope_key(&self) -> &str {
        &self.inner.scope_key
    }

    pub fn require_all(&self) -> bool {
        self.inner.require_all
    }

    pub fn denial_sink(&self) -> DenialSink {
        self.inner.sink
    }

    /// Evaluate one request.
    ///
    /// Never fails: a denial is an [`Outcome`] shaped by the configured [`DenialSink`].
    pub fn evaluate<P>(&self, principal: Option<&P>) -> Outcome
    where
        P: ScopeSource + ?Sized,
    {
        match self.decide(principal) {
            Ok(()) => {
                tracing::trace!(required = ?self.inner.required, "scope check passed");
                Outcome::Proceed
            }
            Err(reason) => {
                tracing::warn!(
                    scope_key = %self.inner.scope_key,
                    required = ?self.inner.required,
                    require_all = self.inner.require_all,
                    reason = reason.as_str(),
                    "insufficient scope"
                );
                self.deny()
            }
        }
    }

    fn decide<P>(&self, principal: Option<&P>) -> Result<(), DenyReason>
    where
        P: ScopeSource + ?Sized,
    {
        // 何も要求しない guard は principal を見ない
        if self.inner.required.is_empty() {
            return Ok(());
        }

        let principal = principal.ok_or(DenyReason::NoPrincipal)?;
        let value = principal
            .scope_value(&self.inner.scope_key)
            .ok_or(DenyReason::NoScopeClaim)?;

        let granted: HashSet<&str> = value.into_scopes().into_iter().collect();

        if self.is_allowed(&granted) {
            Ok(())
        } else {
            Err(DenyReason::InsufficientScope)
        }
    }

    fn is_allowed(&self, granted: &HashSet<&str>) -> bool {
        let mut required = self.inner.required.iter();
        if self.inner.require_all {
            required.all(|scope| granted.contains(scope.as_str()))
        } else {
            required.any(|scope| granted.contains(scope.as_str()))
        }
    }

    fn deny(&self) -> Outcome {
        match self.inner.sink {
            DenialSink::ForwardedError => Outcome::Forward(ScopeError::insufficient_scope()),
            DenialSink::DirectResponse => Outcome::Respond(self.inner.challenge.clone()),
        }
    }
}
