//! HS256 access tokens shared with the authentication service.
//!
//! `sub` carries the caller's user id and `role` feeds the permission check.
//! This server only validates tokens; [`generate_access_token`] exists for
//! service tooling and tests.

use dedupe_core::types::DbId;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: DbId,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// Clock skew tolerated on `exp`, in seconds.
    pub leeway_secs: u64,
}

const DEFAULT_LEEWAY_SECS: u64 = 60;

impl JwtConfig {
    /// | Env Var            | Required | Default |
    /// |--------------------|----------|---------|
    /// | `JWT_SECRET`       | **yes**  | --      |
    /// | `JWT_LEEWAY_SECS`  | no       | `60`    |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is unset or empty.
    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET").unwrap_or_default();
        assert!(!secret.is_empty(), "JWT_SECRET must be set and non-empty");

        let leeway_secs = std::env::var("JWT_LEEWAY_SECS")
            .map(|raw| raw.parse().expect("JWT_LEEWAY_SECS must be a valid u64"))
            .unwrap_or(DEFAULT_LEEWAY_SECS);

        Self {
            secret,
            leeway_secs,
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway_secs;
        validation
    }
}

/// Mint a token for `user_id` valid for `ttl_secs`.
pub fn generate_access_token(
    user_id: DbId,
    role: &str,
    ttl_secs: i64,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        role: role.to_string(),
        exp: now + ttl_secs,
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Check signature and expiry and return the claims.
pub fn validate_token(token: &str, config: &JwtConfig) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &config.validation(),
    )
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.to_string(),
            leeway_secs: 0,
        }
    }

    #[test]
    fn round_trip_keeps_identity() {
        let cfg = config("s3cret");
        let token = generate_access_token(42, "reviewer", 900, &cfg).unwrap();
        let claims = validate_token(&token, &cfg).unwrap();
        assert_eq!((claims.sub, claims.role.as_str()), (42, "reviewer"));
    }

    #[test]
    fn expired_token_is_rejected() {
        let cfg = config("s3cret");
        let token = generate_access_token(1, "viewer", -120, &cfg).unwrap();
        assert!(validate_token(&token, &cfg).is_err());
    }

    #[test]
    fn leeway_accepts_slightly_stale_token() {
        let cfg = JwtConfig {
            leeway_secs: 300,
            ..config("s3cret")
        };
        let token = generate_access_token(1, "viewer", -120, &cfg).unwrap();
        assert!(validate_token(&token, &cfg).is_ok());
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let token = generate_access_token(1, "admin", 900, &config("alpha")).unwrap();
        assert!(validate_token(&token, &config("bravo")).is_err());
    }
}
