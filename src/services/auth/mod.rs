pub mod access_jwt;
pub mod factory;
pub mod scope_guard;

pub use access_jwt::AuthService;
pub use factory::{build_auth_service, build_scope_guard};
