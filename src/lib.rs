//! Scope-based request authorization for axum.
//!
//! [`ScopeGuard`] is built once from the required scopes and a [`GuardConfig`];
//! `middleware::auth::scope::apply` wires it in front of a Router. The rest of
//! the crate is a small resource server hosting the guard behind JWT access tokens.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;

pub use services::auth::scope_guard::{
    AllowScopes, DenialSink, GuardConfig, GuardError, Outcome, ScopeError, ScopeGuard,
    ScopeSource, ScopeValue,
};
