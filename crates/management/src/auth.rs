//! Session verification for admin routes.
//!
//! The OAuth login flow issues an HS256 session token whose `email` claim
//! names the admin. Every admin route requires that token as a bearer
//! credential, and the email's domain must be one of the configured allowed
//! domains.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use portal_core::config::AuthConfig;
use portal_core::{PortalError, PortalResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::error::ApiError;

/// The verified admin behind a request, available to handlers as an
/// `Extension<AdminIdentity>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminIdentity {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct SessionAuth {
    config: Arc<AuthConfig>,
}

impl SessionAuth {
    pub fn new(config: AuthConfig) -> Self {
        if config.allowed_domains.is_empty() {
            warn!("No allowed admin domains configured; every session will be rejected");
        }
        Self {
            config: Arc::new(config),
        }
    }

    /// Sign a session token for `email`, valid for `ttl`.
    pub fn issue_token(&self, email: &str, ttl: Duration) -> PortalResult<String> {
        let now = Utc::now();
        let claims = SessionClaims {
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.session_secret.as_bytes()),
        )
        .map_err(|e| PortalError::Internal(e.into()))
    }

    /// Verify a token: bad signature or expiry is `Unauthorized`, a valid
    /// session from a foreign domain is `Forbidden`.
    pub fn verify(&self, token: &str) -> PortalResult<AdminIdentity> {
        let data = decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.config.session_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| {
            warn!(error = %e, "Session token rejected");
            PortalError::Unauthorized
        })?;

        let email = data.claims.email.trim().to_ascii_lowercase();
        if !self.config.is_allowed_email(&email) {
            warn!(email = %email, "Session from disallowed domain");
            return Err(PortalError::Forbidden);
        }
        Ok(AdminIdentity { email })
    }
}

/// Axum middleware: verifies the bearer session and attaches the
/// [`AdminIdentity`] to the request.
pub async fn require_admin(State(auth): State<SessionAuth>, mut req: Request, next: Next) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let Some(token) = token else {
        return ApiError(PortalError::Unauthorized).into_response();
    };

    match auth.verify(token) {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(e) => ApiError(e).into_response(),
    }
}
