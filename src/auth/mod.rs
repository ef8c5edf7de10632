//! Session authentication for storefront customers.
//!
//! Callers present an HS256 bearer token whose subject is the customer's
//! email address. The `AuthSession` extractor resolves that identity per
//! request; core operations receive it as an explicit value instead of
//! reading ambient session state.

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::{errors::ServiceError, AppState};

/// Claim structure for session tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the customer's email address
    pub sub: String,
    /// Issued at time
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, token_expiration: Duration) -> Self {
        Self {
            jwt_secret,
            token_expiration,
        }
    }
}

/// Issues and validates customer session tokens.
#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_expiration: Duration,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            token_expiration: config.token_expiration,
        }
    }

    /// Issues a signed session token for the given customer email.
    pub fn issue_token(&self, email: &str) -> Result<String, ServiceError> {
        let now = Utc::now();
        let claims = Claims {
            sub: email.to_string(),
            iat: now.timestamp(),
            exp: (now + chrono::Duration::seconds(self.token_expiration.as_secs() as i64))
                .timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::InternalError(format!("failed to sign token: {e}")))
    }

    /// Validates a session token and returns its claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ServiceError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            debug!("Rejected session token: {}", e);
            ServiceError::Unauthenticated("Invalid or expired session token".to_string())
        })?;
        Ok(data.claims)
    }
}

/// The caller's resolved identity for one request.
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// Email address the session token was issued for
    pub email: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = AppState::from_ref(state);

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ServiceError::Unauthenticated("Not authenticated".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ServiceError::Unauthenticated("Not authenticated".to_string()))?;

        let claims = app.auth.validate_token(token)?;

        Ok(AuthSession { email: claims.sub })
    }
}

/// Requires that the caller's customer id matches the resource owner's.
pub fn require_owner(caller_id: i64, owner_id: i64) -> Result<(), ServiceError> {
    if caller_id != owner_id {
        tracing::error!(
            caller_id,
            owner_id,
            "Caller attempted to access a resource owned by a different customer"
        );
        return Err(ServiceError::Forbidden(
            "Not authorized to access this customer's orders".to_string(),
        ));
    }
    Ok(())
}
