//! JWT auth extractors for the user and admin API routes.
//!
//! Extracts the bearer token from `Authorization: Bearer <token>`, decodes it,
//! and resolves the `sub` claim (the user's UUID) against the `users` table.
//! The admin flag always comes from the database, never from the token.
//!
//! Admin-only routes use the `RequireAdmin` extractor to gate access.
//!
//! Tokens are verified with HS256 against `JWT_SECRET`. Unverified decoding
//! exists only behind `serve --insecure-dev-auth`; the server refuses to start
//! without a secret otherwise.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::AppState;

/// Audience every accepted token must carry.
pub const TOKEN_AUDIENCE: &str = "authenticated";

#[derive(Debug, Deserialize)]
struct Claims {
    /// Subject — the user's UUID.
    sub: String,
}

/// Authenticated user info resolved for downstream handlers.
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub user_id: uuid::Uuid,
    pub is_admin: bool,
}

/// How bearer tokens are checked.
#[derive(Clone)]
pub enum TokenAuth {
    /// Full HS256 verification against a shared secret.
    Verified(String),
    /// Decode without checking the signature. Local development only.
    InsecureDev,
}

impl TokenAuth {
    /// Pick the mode from an optional secret. Without a secret the caller
    /// must opt in to unverified decoding explicitly.
    pub fn resolve(secret: Option<String>, insecure_dev: bool) -> anyhow::Result<Self> {
        match secret.filter(|s| !s.is_empty()) {
            Some(secret) => Ok(TokenAuth::Verified(secret)),
            None if insecure_dev => Ok(TokenAuth::InsecureDev),
            None => anyhow::bail!(
                "JWT_SECRET is required to serve (pass --insecure-dev-auth for local development)"
            ),
        }
    }

    /// [`TokenAuth::resolve`] with the secret taken from `JWT_SECRET`.
    pub fn from_env(insecure_dev: bool) -> anyhow::Result<Self> {
        Self::resolve(std::env::var("JWT_SECRET").ok(), insecure_dev)
    }

    pub fn is_insecure(&self) -> bool {
        matches!(self, TokenAuth::InsecureDev)
    }

    fn decode(&self, token: &str) -> Result<Claims, String> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[TOKEN_AUDIENCE]);
        match self {
            TokenAuth::Verified(secret) => {
                let key = DecodingKey::from_secret(secret.as_bytes());
                let data = decode::<Claims>(token, &key, &validation)
                    .map_err(|e| format!("JWT verification failed: {}", e))?;
                Ok(data.claims)
            }
            TokenAuth::InsecureDev => {
                validation.insecure_disable_signature_validation();
                let data = decode::<Claims>(token, &DecodingKey::from_secret(b""), &validation)
                    .map_err(|e| format!("JWT decode failed: {}", e))?;
                Ok(data.claims)
            }
        }
    }
}

/// Resolve the caller from the request headers. `None` when the header is
/// missing, the token does not decode, or the subject is not a known user.
pub async fn extract_auth_user(state: &Arc<AppState>, parts: &Parts) -> Option<AuthUser> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?;

    let token = auth_header.strip_prefix("Bearer ")?;
    let claims = match state.auth.decode(token) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!(error = %e, "rejected bearer token");
            return None;
        }
    };
    let user_id = uuid::Uuid::parse_str(&claims.sub).ok()?;
    let user = state.db.get_user(user_id).await.ok()?;

    Some(AuthUser {
        user_id: user.id,
        is_admin: user.is_admin,
    })
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "unauthorized",
            "message": "Authentication required",
        })),
    )
        .into_response()
}

/// Axum extractor that requires an authenticated admin user.
///
/// Returns 401 if no valid JWT is present, 403 if the user is not an admin.
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_user = extract_auth_user(state, parts)
            .await
            .ok_or_else(unauthorized)?;

        if !auth_user.is_admin {
            return Err((
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({
                    "error": "forbidden",
                    "message": "Admin access required",
                })),
            )
                .into_response());
        }

        Ok(RequireAdmin(auth_user))
    }
}

/// Axum extractor that requires any authenticated user.
///
/// Returns 401 if no valid JWT is present.
pub struct RequireAuth(pub AuthUser);

impl FromRequestParts<Arc<AppState>> for RequireAuth {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_user = extract_auth_user(state, parts)
            .await
            .ok_or_else(unauthorized)?;

        Ok(RequireAuth(auth_user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(key: &[u8]) -> String {
        let exp = (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp();
        let claims = serde_json::json!({
            "sub": uuid::Uuid::nil().to_string(),
            "aud": TOKEN_AUDIENCE,
            "exp": exp,
        });
        encode(&Header::default(), &claims, &EncodingKey::from_secret(key)).unwrap()
    }

    #[test]
    fn missing_secret_requires_opt_in() {
        let err = TokenAuth::resolve(None, false).err().unwrap();
        assert!(err.to_string().contains("JWT_SECRET is required"));
        assert!(TokenAuth::resolve(Some(String::new()), false).is_err());
        assert!(TokenAuth::resolve(None, true).unwrap().is_insecure());
    }

    #[test]
    fn secret_wins_over_dev_flag() {
        let auth = TokenAuth::resolve(Some("s3cret".into()), true).unwrap();
        assert!(!auth.is_insecure());
    }

    #[test]
    fn verified_mode_rejects_foreign_signature() {
        let auth = TokenAuth::Verified("server-secret".into());
        assert!(auth.decode(&token(b"server-secret")).is_ok());
        assert!(auth.decode(&token(b"attacker-key")).is_err());
    }

    #[test]
    fn dev_mode_decodes_any_signature() {
        let claims = TokenAuth::InsecureDev.decode(&token(b"anything")).unwrap();
        assert_eq!(claims.sub, uuid::Uuid::nil().to_string());
    }
}
