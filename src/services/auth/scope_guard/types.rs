/*
 * Responsibility
 * - scope guard の入出力となる型 (AllowScopes / GuardConfig / DenialSink / Outcome)
 * - principal から scope を読み出すための capability trait (ScopeSource)
 * - 拒否時の表現 (Challenge = 直接 403 を返す / ScopeError = 後段へ転送する)
 */
use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Denial message shared by both denial strategies.
pub const INSUFFICIENT_SCOPE: &str = "Insufficient scope";

pub const DEFAULT_SCOPE_KEY: &str = "scope";

const INVALID_ALLOW_SCOPES: &str =
    "Parameter allowScopes must be a string or an array of strings.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    #[error("{0}")]
    InvalidArgument(&'static str),
}

/// Split a space-separated scope string.
///
/// Splits on every single space: `"a  b"` yields `["a", "", "b"]` and `""` yields `[""]`.
/// Empty segments are kept as-is (no trimming, no dedup).
pub fn split_scopes(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(' ')
}

/// Scopes accepted by the guard at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowScopes {
    /// Space-separated list, e.g. `"read write"`.
    Spaced(String),
    List(Vec<String>),
}

impl AllowScopes {
    pub fn into_scopes(self) -> Vec<String> {
        match self {
            AllowScopes::Spaced(raw) => split_scopes(&raw).map(str::to_owned).collect(),
            AllowScopes::List(scopes) => scopes,
        }
    }
}

impl From<&str> for AllowScopes {
    fn from(raw: &str) -> Self {
        Self::Spaced(raw.to_owned())
    }
}

impl From<String> for AllowScopes {
    fn from(raw: String) -> Self {
        Self::Spaced(raw)
    }
}

impl From<Vec<String>> for AllowScopes {
    fn from(scopes: Vec<String>) -> Self {
        Self::List(scopes)
    }
}

impl From<Vec<&str>> for AllowScopes {
    fn from(scopes: Vec<&str>) -> Self {
        Self::List(scopes.into_iter().map(str::to_owned).collect())
    }
}

impl<const N: usize> From<[&str; N]> for AllowScopes {
    fn from(scopes: [&str; N]) -> Self {
        Self::List(scopes.into_iter().map(str::to_owned).collect())
    }
}

/// JSON 由来の設定値はここで型チェックする (string か string の配列のみ許可)
impl TryFrom<serde_json::Value> for AllowScopes {
    type Error = GuardError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::String(raw) => Ok(Self::Spaced(raw)),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    serde_json::Value::String(s) => Ok(s),
                    _ => Err(GuardError::InvalidArgument(INVALID_ALLOW_SCOPES)),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::List),
            _ => Err(GuardError::InvalidArgument(INVALID_ALLOW_SCOPES)),
        }
    }
}

/// Guard options.
///
/// Every field is defaulted, so `{}` (or no config at all) is valid.
/// An empty `scope_key` resolves to `"scope"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GuardConfig {
    pub scope_key: String,
    pub require_all: bool,
    pub error_to_next: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            scope_key: DEFAULT_SCOPE_KEY.to_owned(),
            require_all: false,
            error_to_next: false,
        }
    }
}

impl GuardConfig {
    pub fn with_scope_key(mut self, scope_key: impl Into<String>) -> Self {
        self.scope_key = scope_key.into();
        self
    }

    pub fn with_require_all(mut self, require_all: bool) -> Self {
        self.require_all = require_all;
        self
    }

    pub fn with_error_to_next(mut self, error_to_next: bool) -> Self {
        self.error_to_next = error_to_next;
        self
    }

    pub(crate) fn resolved_scope_key(&self) -> &str {
        if self.scope_key.is_empty() {
            DEFAULT_SCOPE_KEY
        } else {
            &self.scope_key
        }
    }
}

/// How a denial is reported. Chosen once when the guard is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialSink {
    /// 403 + `WWW-Authenticate` challenge, pipeline stops here.
    DirectResponse,
    /// Hand a [`ScopeError`] to the error-handling path instead of writing the response.
    ForwardedError,
}

impl DenialSink {
    pub fn from_config(config: &GuardConfig) -> Self {
        if config.error_to_next {
            Self::ForwardedError
        } else {
            Self::DirectResponse
        }
    }
}

/// Scope value exposed by a principal at a given key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeValue<'a> {
    /// Space-separated string, split like [`split_scopes`].
    Spaced(&'a str),
    List(Vec<&'a str>),
}

impl<'a> ScopeValue<'a> {
    /// Individual scope names, in claim order.
    pub fn into_scopes(self) -> Vec<&'a str> {
        match self {
            ScopeValue::Spaced(raw) => split_scopes(raw).collect(),
            ScopeValue::List(items) => items,
        }
    }
}

/// Capability of a principal to expose granted scopes under a key.
///
/// Returning `None` means "nothing usable at this key" (missing field or wrong type),
/// which the guard treats as no scopes granted.
pub trait ScopeSource {
    fn scope_value(&self, key: &str) -> Option<ScopeValue<'_>>;
}

/// `{"scope": "a b"}` or `{"perms": ["a", "c"]}` style principals.
///
/// Non-string array elements are skipped since they can never equal a scope name.
impl ScopeSource for serde_json::Value {
    fn scope_value(&self, key: &str) -> Option<ScopeValue<'_>> {
        match self.get(key)? {
            serde_json::Value::String(raw) => Some(ScopeValue::Spaced(raw)),
            serde_json::Value::Array(items) => Some(ScopeValue::List(
                items.iter().filter_map(serde_json::Value::as_str).collect(),
            )),
            _ => None,
        }
    }
}

/// Error object forwarded when `error_to_next` is enabled.
///
/// Serializes as `{"statusCode":403,"error":"Forbidden","message":"Insufficient scope"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("{error}: {message}")]
pub struct ScopeError {
    pub status_code: u16,
    pub error: &'static str,
    pub message: &'static str,
}

impl ScopeError {
    pub fn insufficient_scope() -> Self {
        Self {
            status_code: StatusCode::FORBIDDEN.as_u16(),
            error: "Forbidden",
            message: INSUFFICIENT_SCOPE,
        }
    }
}

/// Default error handler for a forwarded denial.
///
/// The error itself stays available in the response extensions so outer layers can rewrite it.
impl IntoResponse for ScopeError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::FORBIDDEN);
        let mut response = (status, axum::Json(&self)).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

/// RFC 6750 §3 challenge written on direct denial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    scopes: String,
}

impl Challenge {
    pub fn new(required: &[String]) -> Self {
        Self {
            scopes: required.join(" "),
        }
    }

    /// `Bearer scope="<scopes>", error="Insufficient scope"`
    pub fn header_value(&self) -> String {
        format!(
            "Bearer scope=\"{}\", error=\"{}\"",
            self.scopes, INSUFFICIENT_SCOPE
        )
    }
}

impl IntoResponse for Challenge {
    fn into_response(self) -> Response {
        let mut response = (StatusCode::FORBIDDEN, INSUFFICIENT_SCOPE).into_response();

        // append: 他の middleware が付けた challenge と共存させる
        match HeaderValue::from_str(&self.header_value()) {
            Ok(value) => {
                response
                    .headers_mut()
                    .append(header::WWW_AUTHENTICATE, value);
            }
            Err(err) => {
                tracing::warn!(error = ?err, "scope challenge is not a valid header value");
            }
        }

        response
    }
}

/// Result of evaluating one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Proceed,
    Forward(ScopeError),
    Respond(Challenge),
}

impl Outcome {
    pub fn is_proceed(&self) -> bool {
        matches!(self, Outcome::Proceed)
    }
}
