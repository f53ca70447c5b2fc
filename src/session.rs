//! Ambient session context
//!
//! The platform's auth service issues the session token and owns refresh;
//! courier only carries the token for outbound calls and reads its claims
//! for identity, roles and permissions. Signatures are NOT verified here:
//! the backend re-validates every call, and the client never holds the
//! signing secret.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::{CourierError, Result};

/// Claims carried in the platform session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Employee user id
    pub sub: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Roles granted to the user (e.g. "EMPLOYEE", "ADMIN")
    #[serde(default)]
    pub roles: Vec<String>,
    /// Fine-grained permissions (e.g. "transfers:write")
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Identity view used by the access control filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: String,
    pub display_name: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

/// Session context supplied by the host environment
#[derive(Debug, Clone)]
pub struct SessionContext {
    token: String,
    claims: Claims,
    user: SessionUser,
}

impl SessionContext {
    /// Build a session context from a raw bearer token
    ///
    /// Fails if the token is not a well-formed JWT; expired tokens are
    /// accepted (the backend rejects them, and `is_expired` lets callers
    /// warn early).
    pub fn from_token(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        let claims = decode_claims(&token)?;
        let user = SessionUser {
            user_id: claims.sub.clone(),
            display_name: claims.name.clone(),
            roles: claims.roles.clone(),
            permissions: claims.permissions.clone(),
        };
        Ok(Self {
            token,
            claims,
            user,
        })
    }

    /// Authorization header value for outbound calls
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Raw token as issued by the auth service
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn user(&self) -> &SessionUser {
        &self.user
    }

    /// Whether the token's expiry has passed
    pub fn is_expired(&self) -> bool {
        self.claims.exp <= now_unix()
    }

    /// Whether the token expires within the next `threshold_seconds`
    pub fn is_expiring_soon(&self, threshold_seconds: u64) -> bool {
        self.claims.exp.saturating_sub(now_unix()) < threshold_seconds
    }
}

/// Decode session token claims without verifying the signature
fn decode_claims(token: &str) -> Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|e| CourierError::Auth(format!("Invalid session token: {}", e)))?;
    Ok(data.claims)
}

/// Extract a token from an Authorization header value.
/// Supports "Bearer <token>" format and raw tokens.
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;

    if let Some(token) = header.strip_prefix("Bearer ") {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    if !header.contains(' ') {
        let token = header.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    None
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
