//! Identity and entitlement collaborators.
//!
//! The pipeline itself never authenticates anyone; it receives a
//! principal that this module resolved from a bearer token at the HTTP
//! edge. Token failure yields 401 `auth_required` before any quota is
//! consumed.

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use echolia_core::quota::{QuotaError, TierSource};
use echolia_proto::Tier;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::collections::HashSet;

use crate::error::ApiError;
use crate::state::AppState;

/// An authenticated actor: user plus device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Stable user identifier (`sub` claim).
    pub user_id: String,
    /// Device identifier from the token.
    pub device_id: String,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    device_id: String,
    #[allow(dead_code)]
    exp: usize,
}

/// HS256 bearer token verifier.
pub struct JwtIdentity {
    key: DecodingKey,
    validation: Validation,
}

impl JwtIdentity {
    /// Build a verifier over a shared HS256 secret.
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Resolve a bearer token to a principal.
    ///
    /// Returns `None` on any signature, expiry, or claim failure; the
    /// caller maps that to 401 without detail.
    pub fn resolve(&self, bearer: &str) -> Option<Principal> {
        let data = jsonwebtoken::decode::<Claims>(bearer, &self.key, &self.validation).ok()?;
        Some(Principal { user_id: data.claims.sub, device_id: data.claims.device_id })
    }
}

impl FromRequestParts<AppState> for Principal {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(ApiError::auth_required)?;

        let token = header.strip_prefix("Bearer ").ok_or_else(ApiError::auth_required)?;

        state.auth.resolve(token).ok_or_else(ApiError::auth_required)
    }
}

/// Entitlement source backed by a configured set of elevated principals.
///
/// Stands in for the add-on registry: principals listed at startup are
/// elevated, everyone else is free.
#[derive(Debug, Clone, Default)]
pub struct StaticTiers {
    elevated: HashSet<String>,
}

impl StaticTiers {
    /// Build from the configured elevated-principal set.
    pub fn new(elevated: HashSet<String>) -> Self {
        Self { elevated }
    }
}

impl TierSource for StaticTiers {
    fn tier_of(&self, principal: &str) -> Result<Tier, QuotaError> {
        if self.elevated.contains(principal) {
            Ok(Tier::Elevated)
        } else {
            Ok(Tier::Free)
        }
    }
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct TestClaims<'a> {
        sub: &'a str,
        device_id: &'a str,
        exp: usize,
    }

    fn token(secret: &str, sub: &str) -> String {
        let claims = TestClaims { sub, device_id: "dev-1", exp: 4_102_444_800 };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn valid_token_resolves_to_principal() {
        let identity = JwtIdentity::new("secret");
        let principal = identity.resolve(&token("secret", "u1")).unwrap();

        assert_eq!(principal.user_id, "u1");
        assert_eq!(principal.device_id, "dev-1");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let identity = JwtIdentity::new("secret");
        assert!(identity.resolve(&token("other", "u1")).is_none());
    }

    #[test]
    fn garbage_token_is_rejected() {
        let identity = JwtIdentity::new("secret");
        assert!(identity.resolve("not-a-jwt").is_none());
    }

    #[test]
    fn static_tiers_split_free_and_elevated() {
        let tiers = StaticTiers::new(["u-pro".to_string()].into_iter().collect());

        assert_eq!(tiers.tier_of("u-pro").unwrap(), Tier::Elevated);
        assert_eq!(tiers.tier_of("u-free").unwrap(), Tier::Free);
    }
}
