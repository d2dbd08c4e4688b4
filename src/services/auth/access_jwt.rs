use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

// Errors returned by access-token verification + strict claim validation.
#[derive(Debug, Error)]
pub enum AccessJwtError {
    #[error("invalid ed25519 public key pem: {0}")]
    InvalidKey(#[source] jsonwebtoken::errors::Error),
    #[error("jwt verification failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("empty '{0}' claim")]
    EmptyClaim(&'static str),
    #[error("invalid 'sub' (expected UUID)")]
    InvalidSubUuid,
}

/// Access token (JWT) claims.
///
/// NOTE:
/// - `aud` is validated by jsonwebtoken via `Validation::set_audience`.
/// - 残りの claim (`scope`, `roles`, `scp`, `permissions`, ...) は型を決めずに `extra` に残す。
///   `scope` が string でも array でも受け付けるため。解釈は scope guard の責務。
#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenClaims {
    pub iss: String,
    pub sub: String,
    pub exp: u64,

    #[serde(default)]
    pub jti: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// AuthService が返す「検証済み・アプリ側で使う型」
///
/// - 'sub' はプロジェクト規約として UUID なので、ここでは `Uuid` に昇格させる
/// - `claims` は iss/sub/exp/jti 以外の claim (object)
#[derive(Debug, Clone)]
pub struct VerifiedAccessToken {
    pub user_id: Uuid,
    pub exp: u64,
    pub jti: Option<String>,
    pub claims: Value,
}

/// EdDSA (Ed25519) access-token verifier.
///
/// - Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct AuthService {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("AuthService")
            .field("validation", &self.validation)
            .finish()
    }
}

impl AuthService {
    pub fn new(
        access_public_key_pem: &str,
        issuer: &str,
        audience: &str,
        leeway_seconds: u64,
    ) -> Result<Self, AccessJwtError> {
        let decoding_key = DecodingKey::from_ed_pem(access_public_key_pem.as_bytes())
            .map_err(AccessJwtError::InvalidKey)?;

        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.leeway = leeway_seconds;

        Ok(Self {
            decoding_key,
            validation,
        })
    }

    /// Verify signature + `exp`/`iss`/`aud`, then check that `iss`/`sub` are non-empty
    /// and `sub` is a UUID.
    ///
    /// This is the entry-point for middleware.
    pub fn verify(&self, token: &str) -> Result<VerifiedAccessToken, AccessJwtError> {
        let claims =
            jsonwebtoken::decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)?
                .claims;

        if claims.iss.trim().is_empty() {
            return Err(AccessJwtError::EmptyClaim("iss"));
        }
        if claims.sub.trim().is_empty() {
            return Err(AccessJwtError::EmptyClaim("sub"));
        }

        // Project convention: subject is a UUID
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AccessJwtError::InvalidSubUuid)?;

        Ok(VerifiedAccessToken {
            user_id,
            exp: claims.exp,
            jti: claims.jti,
            claims: Value::Object(claims.extra),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn scope_claim_may_be_string_or_array() {
        for scope in [json!("read write"), json!(["read", "write"])] {
            let claims: AccessTokenClaims = serde_json::from_value(json!({
                "iss": "https://issuer.test",
                "sub": "0b6f8f8e-3c1a-4a4e-9d55-5d0f4a3c2b11",
                "exp": 1_900_000_000u64,
                "scope": scope.clone(),
                "scp": ["admin"],
            }))
            .unwrap();

            assert_eq!(claims.extra.get("scope"), Some(&scope));
            assert_eq!(claims.extra.get("scp"), Some(&json!(["admin"])));
            assert!(!claims.extra.contains_key("sub"));
            assert_eq!(claims.jti, None);
        }
    }
}
