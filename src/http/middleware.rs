//! Authentication middleware and JWT verification

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;

use crate::app::AppState;
use crate::model::Actor;
use crate::util::time::unix_secs;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Deserialize)]
struct JwtHeader {
    alg: String,
}

/// Profile fields Supabase copies from the identity provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// JWT claims from Supabase auth token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Audience
    #[serde(default)]
    pub aud: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: u64,
    /// Email (if available)
    #[serde(default)]
    pub email: Option<String>,
    /// Role
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub user_metadata: Option<UserMetadata>,
}

impl JwtClaims {
    /// Name shown on reports and claims
    pub fn display_name(&self) -> Option<String> {
        let metadata = self.user_metadata.as_ref()?;
        [&metadata.full_name, &metadata.name]
            .into_iter()
            .flatten()
            .map(|n| n.trim())
            .find(|n| !n.is_empty())
            .map(str::to_string)
    }
}

/// Verify a JWT token and extract claims
pub fn verify_jwt(token: &str, secret: &str) -> Result<JwtClaims, AuthError> {
    // Split token into parts
    let parts: Vec<&str> = token.split('.').collect();
    let [header_b64, payload_b64, signature_b64] = parts.as_slice() else {
        return Err(AuthError::InvalidToken);
    };

    let header: JwtHeader = decode_segment(header_b64)?;
    if header.alg != "HS256" {
        return Err(AuthError::InvalidToken);
    }

    // Verify signature (HMAC-SHA256)
    let message = format!("{}.{}", header_b64, payload_b64);

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AuthError::InvalidToken)?;
    mac.update(message.as_bytes());

    let provided_signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AuthError::InvalidToken)?;
    mac.verify_slice(&provided_signature)
        .map_err(|_| AuthError::InvalidToken)?;

    let claims: JwtClaims = decode_segment(payload_b64)?;

    if claims.exp < unix_secs() {
        return Err(AuthError::TokenExpired);
    }
    if claims.sub.trim().is_empty() {
        return Err(AuthError::InvalidToken);
    }

    Ok(claims)
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, AuthError> {
    let json = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AuthError::InvalidToken)?;
    serde_json::from_slice(&json).map_err(|_| AuthError::InvalidToken)
}

/// Authentication error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing or malformed bearer token")]
    MissingHeader,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() });
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

/// Authenticated user extractor result
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub actor: Actor,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: JwtClaims) -> Self {
        let display_name = claims.display_name();
        Self {
            actor: Actor::new(claims.sub, display_name),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.actor.user_id
    }
}

/// Middleware to require authentication
pub async fn require_auth(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let TypedHeader(authorization) = bearer.ok_or(AuthError::MissingHeader)?;

    let claims = verify_jwt(authorization.token(), &state.config.supabase_jwt_secret).map_err(|e| {
        debug!(error = %e, "Rejected bearer token");
        e
    })?;

    // Insert into request extensions for handlers to access
    request
        .extensions_mut()
        .insert(AuthenticatedUser::from_claims(claims));

    Ok(next.run(request).await)
}

/// Sign claims the way Supabase does, for tests
#[cfg(test)]
pub fn sign_token(claims: &serde_json::Value, secret: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    let message = format!("{}.{}", header, payload);

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(message.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    format!("{}.{}", message, signature)
}
