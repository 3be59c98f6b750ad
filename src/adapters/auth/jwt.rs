//! HS-family JWT token service.
//!
//! Issues and validates access tokens signed with a shared secret. Claims
//! carry the user id (`sub`), granted scopes, and expiry. Scope checks
//! against a required set are left to the caller.
//!
//! # Example
//!
//! ```ignore
//! use task_pulse::adapters::auth::JwtTokenService;
//!
//! let service = JwtTokenService::from_config(&config.auth)?;
//! let token = service.issue(&UserId::new("42")?, &["ADMIN".to_string()])?;
//! let user = service.validate(&token).await?;
//! ```

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::domain::foundation::{AuthError, AuthenticatedUser, Timestamp, UserId};
use crate::ports::TokenValidator;

/// JWT claims issued by this service.
#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    /// Subject - the user ID
    sub: String,

    /// Granted scopes
    #[serde(default)]
    scopes: Vec<String>,

    /// Expiry timestamp (Unix epoch seconds)
    exp: i64,
}

/// Issues and validates shared-secret JWTs.
pub struct JwtTokenService {
    secret: Secret<String>,
    algorithm: Algorithm,
    ttl: Duration,
}

impl JwtTokenService {
    pub fn new(secret: impl Into<String>, algorithm: Algorithm, ttl: Duration) -> Self {
        Self {
            secret: Secret::new(secret.into()),
            algorithm,
            ttl,
        }
    }

    /// Build from configuration, rejecting non-HMAC algorithms.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let algorithm = Algorithm::from_str(&config.jwt_algorithm).map_err(|_| {
            AuthError::service_unavailable(format!(
                "unknown JWT algorithm '{}'",
                config.jwt_algorithm
            ))
        })?;
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(AuthError::service_unavailable(format!(
                "JWT algorithm '{}' needs a key pair",
                config.jwt_algorithm
            )));
        }
        Ok(Self::new(
            config.jwt_secret.expose_secret().clone(),
            algorithm,
            config.access_token_ttl(),
        ))
    }

    /// Issue a token for `user_id` valid for the configured lifetime.
    pub fn issue(&self, user_id: &UserId, scopes: &[String]) -> Result<String, AuthError> {
        let expires_at = Timestamp::now().plus_secs(self.ttl.as_secs() as i64);
        self.issue_until(user_id, scopes, expires_at)
    }

    /// Issue a token expiring at `expires_at`.
    pub fn issue_until(
        &self,
        user_id: &UserId,
        scopes: &[String],
        expires_at: Timestamp,
    ) -> Result<String, AuthError> {
        self.ensure_secret()?;
        let claims = AccessClaims {
            sub: user_id.to_string(),
            scopes: scopes.to_vec(),
            exp: expires_at.as_unix_secs(),
        };
        encode(
            &Header::new(self.algorithm),
            &claims,
            &EncodingKey::from_secret(self.secret.expose_secret().as_bytes()),
        )
        .map_err(|e| AuthError::service_unavailable(e.to_string()))
    }

    fn ensure_secret(&self) -> Result<(), AuthError> {
        if self.secret.expose_secret().is_empty() {
            return Err(AuthError::service_unavailable("JWT secret not configured"));
        }
        Ok(())
    }
}

#[async_trait]
impl TokenValidator for JwtTokenService {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        self.ensure_secret()?;

        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.secret.expose_secret().as_bytes()),
            &validation,
        )
        .map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("Token expired");
                    AuthError::TokenExpired
                }
                _ => {
                    tracing::debug!("Token validation failed: {}", e);
                    AuthError::InvalidToken
                }
            }
        })?;

        let user_id = UserId::new(data.claims.sub).map_err(|_| {
            tracing::warn!("Token has empty subject");
            AuthError::InvalidToken
        })?;

        Ok(AuthenticatedUser::new(user_id, data.claims.scopes))
    }
}

impl std::fmt::Debug for JwtTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtTokenService")
            .field("algorithm", &self.algorithm)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
